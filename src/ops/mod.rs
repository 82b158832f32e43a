pub mod account;
pub mod catalog;
pub mod recipe;
pub mod relations;
pub mod shopping_list;
pub mod short_link;
