//! Backlog generation and management: input parsing, rule tables, the
//! generator, validation, reorder/group, and the service layer.

pub mod generate;
pub mod input;
pub mod ordering;
pub mod rules;
pub mod service;
pub mod validate;

pub use generate::{GeneratorInput, generate_all_tasks};
pub use input::{GoalParts, ParsedInput, parse_goal, parse_input, parse_roles};
pub use ordering::{GroupError, ReorderError, check_permutation, group_items, reorder_items};
pub use rules::{RuleTables, RulesError};
pub use service::{BacklogError, SpecWithTasks};
pub use validate::{
    FieldError, GroupRequest, ReorderRequest, SpecInput, TaskUpdate, ValidGroup, ValidSpec,
    ValidationErrors,
};
