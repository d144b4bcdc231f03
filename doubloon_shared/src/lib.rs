use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQLite file opened by both the server and the admin CLI, created if missing.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://doubloon.db?mode=rwc";

/// Largest leaderboard either surface will return.
pub const MAX_LEADERBOARD: usize = 50;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinRequest {
    pub user_id: String,
    pub stake: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WagerRequest {
    pub user_id: String,
    pub stake: u64,
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RedeemRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminSetGoldRequest {
    pub user_id: String,
    pub gold: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineWinView {
    pub line: usize,
    pub symbol: String,
    pub gold: f64,
    pub xp: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinView {
    /// Symbol names, three rows of three.
    pub grid: Vec<Vec<String>>,
    pub raw_gold: f64,
    pub gold: i64,
    pub xp: u64,
    pub lines: Vec<LineWinView>,
    pub wild: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BonusView {
    pub remaining_spins: u32,
    pub wager_per_spin: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WagerResponse {
    pub user_id: String,
    pub stake: u64,
    pub cost: i64,
    pub boost_percent: f64,
    pub spins: Vec<SpinView>,
    pub total_gold: i64,
    pub total_xp: u64,
    pub bonus: Option<BonusView>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BonusResponse {
    pub user_id: String,
    pub wager_per_spin: u64,
    pub boost_percent: f64,
    pub spins: Vec<SpinView>,
    pub total_gold: i64,
    pub total_xp: u64,
    pub capped: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PendingBonusResponse {
    pub user_id: String,
    pub bonus: Option<BonusView>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProfileResponse {
    pub user_id: String,
    pub title: String,
    pub level: u32,
    pub xp: u64,
    pub xp_needed: u64,
    pub gold: i64,
    pub boost_percent: f64,
    pub progress_bar: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: String,
    pub gold: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LeaderboardResponse {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<LeaderboardRow>,
}

/// Body returned alongside every non-2xx status.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Stable machine-readable code for [`ErrorBody::error`].
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Invalid(_) => "invalid_request",
            ApiError::InsufficientFunds(_) => "insufficient_funds",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Internal => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
            message: self.to_string(),
        }
    }
}
