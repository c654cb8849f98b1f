//! Handlers for the questionnaire and assessment endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/questionnaire` | The standard definition |
//! | `POST` | `/users/:id/assessments` | Requires a verified user |
//! | `GET`  | `/users/:id/assessments` | Newest first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use finwell_core::{
  provider::{AggregationProvider, MailSender, SmsVerifier},
  questionnaire::{AnswerSet, QuestionnaireDefinition},
  score::{AssessmentRecord, HealthScore, NewAssessment, compute_health_score},
  store::WellnessStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /questionnaire`
pub async fn questionnaire() -> Json<QuestionnaireDefinition> {
  Json(QuestionnaireDefinition::standard())
}

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub answers: AnswerSet,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub assessment: AssessmentRecord,
  pub score:      HealthScore,
}

/// `POST /users/:id/assessments` — score the submitted answers against the
/// standard questionnaire and persist the result. The raw answer set is
/// stored verbatim alongside the score.
pub async fn submit<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  let user = state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
  if !user.is_verified {
    return Err(ApiError::Unauthorized("email not verified".to_string()));
  }

  let definition = QuestionnaireDefinition::standard();
  let score = compute_health_score(&body.answers, &definition.questions);

  let assessment = state
    .store
    .record_assessment(NewAssessment {
      user_id,
      answers: body.answers,
      raw_score: score.raw_score,
      tier: score.tier,
    })
    .await
    .map_err(ApiError::store)?;

  Ok((StatusCode::CREATED, Json(SubmitResponse { assessment, score })))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users/:id/assessments`
pub async fn list<S, A, M, V>(
  State(state): State<AppState<S, A, M, V>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AssessmentRecord>>, ApiError>
where
  S: WellnessStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  A: AggregationProvider,
  M: MailSender,
  V: SmsVerifier,
{
  state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;

  let assessments = state
    .store
    .list_assessments(user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(assessments))
}
