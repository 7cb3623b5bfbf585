pub mod apply;
pub mod builtin;
pub mod export;
pub mod restore;
pub mod run;
pub mod show_run;
