pub mod filters;

pub use filters::ListFilters;
