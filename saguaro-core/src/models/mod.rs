pub mod chat;
pub mod expense;
pub mod flag;

pub use chat::{ChatTurn, ExpenseRef, ModelMessage};
pub use expense::{Expense, NewExpense};
pub use flag::{FlaggedItem, NewFlag};
