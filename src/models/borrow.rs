//! Borrow (loan) model, state tag and status projection

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookSummary;
use super::user::UserSummary;

/// Borrow record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrow {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    /// Always borrowed_at + the loan period, fixed at creation
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Borrow {
    /// Maximum concurrent open borrows per user
    pub const MAX_ACTIVE_BORROWS: i64 = 3;
    /// Loan period added to borrowed_at to produce due_date
    pub const DEFAULT_LOAN_DAYS: i64 = 14;

    /// Due date for a loan starting at `borrowed_at`
    pub fn due_date_from(borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at + Duration::days(Self::DEFAULT_LOAN_DAYS)
    }

    /// Open/closed tag derived from the nullable returned_at marker
    pub fn state(&self) -> BorrowState {
        match self.returned_at {
            None => BorrowState::Open,
            Some(returned_at) => BorrowState::Closed { returned_at },
        }
    }
}

/// Lifecycle state of a borrow record
///
/// A closed record is immutable; no further transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowState {
    Open,
    Closed { returned_at: DateTime<Utc> },
}

/// Presentation status derived from a borrow record and the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Active,
    Overdue,
    Returned,
}

/// Status filter for borrow list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowFilter {
    Active,
    All,
}

/// Borrow projection returned by the API
///
/// Derived fields are computed at read time, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub is_overdue: bool,
    pub days_overdue: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

impl BorrowDetails {
    /// Project a borrow record into its presentation form.
    ///
    /// Pure: deterministic for a given record state and `now`. Missing
    /// relations stay absent in the output.
    pub fn project(
        borrow: &Borrow,
        book: Option<BookSummary>,
        user: Option<UserSummary>,
        now: DateTime<Utc>,
    ) -> Self {
        let (status, is_overdue) = match borrow.state() {
            BorrowState::Closed { .. } => (BorrowStatus::Returned, false),
            BorrowState::Open if now > borrow.due_date => (BorrowStatus::Overdue, true),
            BorrowState::Open => (BorrowStatus::Active, false),
        };

        let days_overdue = if is_overdue {
            // Ceiling in whole days: any overdue record reports at least 1
            let seconds = (now - borrow.due_date).num_seconds();
            (seconds + 86_399) / 86_400
        } else {
            0
        };

        BorrowDetails {
            id: borrow.id,
            borrowed_at: borrow.borrowed_at,
            due_date: borrow.due_date,
            returned_at: borrow.returned_at,
            status,
            is_overdue,
            days_overdue,
            book,
            user,
        }
    }
}
