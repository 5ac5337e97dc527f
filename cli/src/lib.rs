pub mod merge;
pub mod post_run;
pub mod scanner;
