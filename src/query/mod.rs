// Submodules for separation of concerns
mod builder;
mod cursor;
mod eval;
mod exec;
mod parse;
mod project;
mod types;
mod update;

// Public API re-exports
pub use builder::FindBuilder;
pub use cursor::Cursor;
pub use eval::{compare_docs, eval_filter};
pub use exec::{
    count_docs, delete_many, delete_one, find_docs, find_one, find_one_and_replace,
    find_one_and_update, find_one_required, replace_one, update_many, update_one,
};
pub use parse::{
    parse_filter, parse_filter_json, parse_projection, parse_projection_json, parse_update,
    parse_update_json,
};
pub use project::{Projection, ProjectionPlan};
pub use types::{
    CmpOp, DeleteSummary, Expr, Filter, FindAndModifyOptions, FindOptions, MutationSummary, Order,
    ReplaceOptions, SortSpec, UpdateDoc, UpdateOptions,
};
pub use update::apply_update;
