mod form;
pub mod window;
