pub mod build;
pub mod clean;
pub mod destination_list;
pub mod package;
pub mod scheme_list;
