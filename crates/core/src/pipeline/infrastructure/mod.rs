pub mod threaded_dispatch_executor;
