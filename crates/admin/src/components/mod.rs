//! Reusable view pieces for admin templates.

pub mod data_table;

pub use data_table::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
