use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use super::{ApiError, AppState};
use crate::error::SpectraError;
use crate::session::{ArtifactKind, SessionId};

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyEqResponse {
    pub session_id: String,
    pub processed_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractVocalsResponse {
    pub session_id: String,
    pub vocal_url: String,
    pub instrumental_url: String,
}

/// Retrieval URL for an artifact
fn audio_url(session: &SessionId, kind: ArtifactKind) -> String {
    format!("/api/audio/{}/{}", session, kind)
}

/// Multipart fields understood by the upload endpoints
#[derive(Default)]
struct Upload {
    audio: Option<Bytes>,
    eq_settings: Option<String>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut upload = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "audio" => upload.audio = Some(field.bytes().await.map_err(bad_multipart)?),
                "eq_settings" | "eqSettings" => {
                    upload.eq_settings = Some(field.text().await.map_err(bad_multipart)?)
                }
                _ => {}
            }
        }

        Ok(upload)
    }

    fn audio(&mut self) -> ApiResult<Bytes> {
        self.audio
            .take()
            .ok_or_else(|| SpectraError::validation("missing multipart field 'audio'").into())
    }
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    SpectraError::validation(format!("invalid multipart body: {}", err)).into()
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn apply_eq(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ApplyEqResponse>> {
    let mut upload = Upload::read(multipart).await?;
    let audio = upload.audio()?;
    let settings = upload
        .eq_settings
        .take()
        .ok_or_else(|| SpectraError::validation("missing multipart field 'eq_settings'"))?;

    let processor = state.processor.clone();
    let session = state
        .run_blocking(move || processor.process(&audio, &settings))
        .await?;

    Ok(Json(ApplyEqResponse {
        session_id: session.to_string(),
        processed_url: audio_url(&session, ArtifactKind::Processed),
    }))
}

pub async fn extract_vocals(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ExtractVocalsResponse>> {
    if !state.separation.is_available() {
        return Err(SpectraError::SeparationUnavailable {
            reason: "no separator is configured".to_string(),
        }
        .into());
    }

    let mut upload = Upload::read(multipart).await?;
    let audio = upload.audio()?;

    let separation = state.separation.clone();
    let session = state
        .run_blocking(move || separation.separate(&audio))
        .await?;

    Ok(Json(ExtractVocalsResponse {
        session_id: session.to_string(),
        vocal_url: audio_url(&session, ArtifactKind::Vocals),
        instrumental_url: audio_url(&session, ArtifactKind::Instrumental),
    }))
}

/// Stream a stored artifact
///
/// An unknown kind is a 400 even for unknown sessions. A malformed session
/// id is reported as 404, the same as a session that does not exist.
pub async fn get_audio(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
) -> ApiResult<Response> {
    let kind: ArtifactKind = kind.parse()?;
    let session: SessionId = session_id
        .parse()
        .map_err(|_| SpectraError::not_found(format!("session {}", session_id)))?;

    let path = state.processor.retrieve(&session, kind)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SpectraError::not_found(format!("{} for session {}", kind, session)),
        _ => SpectraError::Io(e),
    })?;
    let len = file.metadata().await.map_err(SpectraError::Io)?.len();

    let headers = [
        (header::CONTENT_TYPE, "audio/wav".to_string()),
        (header::CONTENT_LENGTH, len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", kind.file_name()),
        ),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_audio_url() {
        let session: SessionId = "5f0c1a8e-3b0a-4a52-9d3c-6a1f3f1e2b7d".parse().unwrap();
        assert_eq!(
            audio_url(&session, ArtifactKind::Vocals),
            "/api/audio/5f0c1a8e-3b0a-4a52-9d3c-6a1f3f1e2b7d/vocals"
        );
    }

    #[test]
    fn test_response_field_names() {
        let body = serde_json::to_value(ExtractVocalsResponse {
            session_id: "s".into(),
            vocal_url: "v".into(),
            instrumental_url: "i".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"sessionId": "s", "vocalUrl": "v", "instrumentalUrl": "i"})
        );
    }
}
