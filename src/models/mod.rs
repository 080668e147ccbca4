pub mod action;
pub mod board;
pub mod book;
pub mod forms;
pub mod token_usage;
pub mod user;

pub use action::{ActionKind, ActionPayload, AuthorBookAction};
pub use board::{Ad, AdFilter, BoardStatistics, Category, CategoryStat, Comment, NewAd};
pub use book::{Book, BookInput, BookOrdering, BookPatch, BookQuery};
pub use token_usage::TokenUsage;
pub use user::{NewProfile, Profile, ProfileUpdate, User};
