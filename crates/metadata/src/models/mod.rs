pub(crate) mod course;
pub(crate) mod file;
pub(crate) mod view;
