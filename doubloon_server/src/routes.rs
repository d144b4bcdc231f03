use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use serde::Deserialize;
use tracing::{error, info};

use doubloon_core::{
    BonusResult, EntropyRolls, GameError, PendingBonus, SpinRecord, SymbolTable, WagerEngine,
    WagerResult,
};
use doubloon_shared::{
    AdminSetGoldRequest, ApiError, BonusResponse, BonusView, LeaderboardResponse, LeaderboardRow,
    LineWinView, PendingBonusResponse, ProfileResponse, RedeemRequest, SpinRequest, SpinView,
    WagerRequest, WagerResponse, MAX_LEADERBOARD,
};

use crate::store::SqliteProfileStore;

pub type Engine = WagerEngine<SqliteProfileStore, EntropyRolls>;

const DEFAULT_LEADERBOARD: usize = 10;

pub struct AppState {
    pub engine: Engine,
    pub api_key: String,
}

/// HTTP face of an [`ApiError`].
#[derive(Debug)]
pub struct Failure(pub ApiError);

impl Failure {
    fn status(&self) -> StatusCode {
        match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0.body())).into_response()
    }
}

impl From<GameError> for Failure {
    fn from(err: GameError) -> Self {
        let api = match &err {
            GameError::InsufficientFunds { .. } => ApiError::InsufficientFunds(err.to_string()),
            GameError::WagerTooLarge { .. }
            | GameError::TooManySpins { .. }
            | GameError::InvalidStake
            | GameError::InvalidSpinCount => ApiError::Invalid(err.to_string()),
            GameError::NoBonusAvailable => ApiError::NotFound(err.to_string()),
            GameError::Store(store_err) => {
                error!("profile store failure: {store_err}");
                ApiError::Internal
            }
        };
        Failure(api)
    }
}

type ApiReply<T> = Result<Json<T>, Failure>;

fn spin_view(table: &SymbolTable, spin: &SpinRecord) -> SpinView {
    SpinView {
        grid: spin
            .grid
            .names(table)
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect(),
        raw_gold: spin.raw_gold,
        gold: spin.gold,
        xp: spin.xp,
        lines: spin
            .lines
            .iter()
            .map(|w| LineWinView {
                line: w.line,
                symbol: table.name(w.symbol).to_string(),
                gold: w.gold,
                xp: w.xp,
            })
            .collect(),
        wild: spin.wild,
    }
}

fn bonus_view(bonus: PendingBonus) -> BonusView {
    BonusView {
        remaining_spins: bonus.remaining_spins,
        wager_per_spin: bonus.wager_per_spin,
    }
}

fn wager_response(table: &SymbolTable, result: WagerResult) -> WagerResponse {
    WagerResponse {
        spins: result.spins.iter().map(|s| spin_view(table, s)).collect(),
        user_id: result.user_id,
        stake: result.stake,
        cost: result.cost,
        boost_percent: result.boost_percent,
        total_gold: result.total_gold,
        total_xp: result.total_xp,
        bonus: result.bonus.map(bonus_view),
    }
}

fn bonus_response(table: &SymbolTable, result: BonusResult) -> BonusResponse {
    BonusResponse {
        spins: result.spins.iter().map(|s| spin_view(table, s)).collect(),
        user_id: result.user_id,
        wager_per_spin: result.wager_per_spin,
        boost_percent: result.boost_percent,
        total_gold: result.total_gold,
        total_xp: result.total_xp,
        capped: result.capped,
    }
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpinRequest>,
) -> ApiReply<WagerResponse> {
    let result = state.engine.spin(&req.user_id, req.stake).await?;
    Ok(Json(wager_response(state.engine.table(), result)))
}

async fn route_wager(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WagerRequest>,
) -> ApiReply<WagerResponse> {
    let result = state.engine.wager(&req.user_id, req.stake, req.count).await?;
    Ok(Json(wager_response(state.engine.table(), result)))
}

async fn route_redeem(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RedeemRequest>,
) -> ApiReply<BonusResponse> {
    let result = state.engine.redeem_bonus(&req.user_id).await?;
    Ok(Json(bonus_response(state.engine.table(), result)))
}

async fn route_pending_bonus(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<PendingBonusResponse> {
    let bonus = state.engine.pending_bonus(&user_id).await.map(bonus_view);
    Json(PendingBonusResponse { user_id, bonus })
}

async fn route_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiReply<ProfileResponse> {
    let s = state.engine.progression_summary(&user_id).await?;
    Ok(Json(ProfileResponse {
        user_id: s.user_id,
        title: s.title,
        level: s.level,
        xp: s.xp,
        xp_needed: s.xp_needed,
        gold: s.gold,
        boost_percent: s.boost_percent,
        progress_bar: s.progress_bar,
    }))
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

async fn route_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LeaderboardQuery>,
) -> ApiReply<LeaderboardResponse> {
    let limit = q.limit.unwrap_or(DEFAULT_LEADERBOARD).clamp(1, MAX_LEADERBOARD);
    let entries = state.engine.leaderboard(limit).await?;
    Ok(Json(LeaderboardResponse {
        generated_at: chrono::Utc::now(),
        entries: entries
            .into_iter()
            .enumerate()
            .map(|(i, e)| LeaderboardRow {
                rank: i + 1,
                user_id: e.user_id,
                gold: e.gold,
            })
            .collect(),
    }))
}

async fn route_admin_set_gold(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): TypedHeader<
        axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
    >,
    Json(req): Json<AdminSetGoldRequest>,
) -> Result<StatusCode, Failure> {
    if bearer.token() != state.api_key {
        return Err(Failure(ApiError::Unauthorized));
    }
    state
        .engine
        .store()
        .set_gold(&req.user_id, req.gold)
        .await
        .map_err(|err| {
            error!("set-gold failed: {err:#}");
            Failure(ApiError::Internal)
        })?;
    info!(user_id = %req.user_id, gold = req.gold, "admin set gold");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/spin", post(route_spin))
        .route("/wager", post(route_wager))
        .route("/bonus/redeem", post(route_redeem))
        .route("/bonus/:user_id", get(route_pending_bonus))
        .route("/profile/:user_id", get(route_profile))
        .route("/leaderboard", get(route_leaderboard))
        .route("/admin/set-gold", post(route_admin_set_gold))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doubloon_core::{Grid, StoreError};

    #[test]
    fn game_errors_map_to_statuses() {
        let cases = [
            (
                GameError::InsufficientFunds { required: 100, available: 50 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (GameError::WagerTooLarge { stake: 5000, max: 1000 }, StatusCode::BAD_REQUEST),
            (GameError::TooManySpins { count: 9, max: 5 }, StatusCode::BAD_REQUEST),
            (GameError::InvalidStake, StatusCode::BAD_REQUEST),
            (GameError::NoBonusAvailable, StatusCode::NOT_FOUND),
            (
                GameError::Store(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(Failure::from(err).status(), status);
        }
    }

    #[test]
    fn spin_view_uses_symbol_names() {
        let table = SymbolTable::pirate_default();
        let grid = Grid::from_names(&table, ["chest"; 9]).unwrap();
        let payout = doubloon_core::evaluate(&grid, &table, 1.0);
        let record = SpinRecord {
            grid,
            raw_gold: payout.gold,
            gold: payout.gold as i64,
            xp: payout.xp,
            lines: payout.lines,
            wild: false,
        };
        let view = spin_view(&table, &record);
        assert_eq!(view.grid, vec![vec!["chest".to_string(); 3]; 3]);
        assert_eq!(view.lines.len(), 5);
        assert!(view.lines.iter().all(|l| l.symbol == "chest"));
    }
}
