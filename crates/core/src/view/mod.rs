pub mod overlay;
pub mod page;
pub mod recommendations;
pub mod view_state;
