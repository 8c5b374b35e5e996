use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use hyper::body::{Bytes, HttpBody};
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, LOCATION, SET_COOKIE};
use hyper::{Body, Method, Request, Response, StatusCode};
use leaf_serve::Registry;
use log::{debug, info};

use crate::error::AppError;
use crate::form::OptionsForm;
use crate::pages;
use crate::session::SessionStore;
use crate::uploads;

/// Largest options form body accepted.
pub const MAX_FORM_BYTES: usize = 4 * 1024;

/// Everything a request handler needs, shared by all connections.
pub struct App {
    pub registry: Arc<Registry>,
    pub sessions: SessionStore,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl App {
    pub fn new(registry: Arc<Registry>, uploads_dir: PathBuf, max_upload_bytes: u64) -> Self {
        App {
            registry,
            sessions: SessionStore::new(),
            uploads_dir,
            max_upload_bytes,
        }
    }

    pub fn with_session_limits(mut self, idle: Duration, capacity: usize) -> Self {
        self.sessions = SessionStore::with_limits(idle, capacity);
        self
    }
}

pub async fn handle(req: Request<Body>, app: Arc<App>) -> Result<Response<Body>, Infallible> {
    debug!("{} {}", req.method(), req.uri());

    let result = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => Ok(pages::html(pages::HOME)),
        (&Method::GET, "/options") => Ok(show_options(req, &app).await),
        (&Method::POST, "/options") => submit_options(req, &app).await,
        (&Method::GET, "/demo") => Ok(pages::html(pages::DEMO)),
        (&Method::POST, "/predict") => predict(req, &app).await,
        (&Method::GET, "/team") => Ok(pages::html(pages::TEAM)),
        (_, "/options") | (_, "/predict") => Ok(method_not_allowed("POST")),
        (_, "/") | (_, "/demo") | (_, "/team") => Ok(method_not_allowed("GET")),
        _ => Ok(pages::text(StatusCode::NOT_FOUND, "Not Found")),
    };

    Ok(result.unwrap_or_else(AppError::into_response))
}

fn method_not_allowed(allow: &'static str) -> Response<Body> {
    let mut response = pages::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn with_session_cookie(mut response: Response<Body>, cookie: Option<HeaderValue>) -> Response<Body> {
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

async fn show_options(req: Request<Body>, app: &App) -> Response<Body> {
    let handle = app.sessions.resolve(req.headers()).await;
    let selected = handle.session.crop.map(|c| c.name());

    let page = pages::options(&handle.session.csrf_token, selected, &[]);
    with_session_cookie(pages::html(page), handle.set_cookie())
}

/// Collects a request body, giving up as soon as it grows past `limit`.
async fn read_limited(req: Request<Body>, limit: usize) -> Result<Bytes, AppError> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|len| len.to_str().ok())
        .and_then(|len| len.parse::<u64>().ok());
    if declared.map_or(false, |len| len > limit as u64) {
        return Err(AppError::BodyTooLarge { limit });
    }

    let mut body = req.into_body();
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(AppError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

async fn submit_options(req: Request<Body>, app: &App) -> Result<Response<Body>, AppError> {
    let handle = app.sessions.resolve(req.headers()).await;
    let form = OptionsForm::parse(&read_limited(req, MAX_FORM_BYTES).await?);

    let response = match form.validate(&handle.session.csrf_token) {
        Ok(crop) => {
            app.sessions.set_crop(&handle.id, crop).await;
            info!("Session {} selected {}", handle.id, crop);

            let mut response = pages::text(StatusCode::SEE_OTHER, "");
            response
                .headers_mut()
                .insert(LOCATION, HeaderValue::from_static("/demo"));
            response
        }
        Err(errors) => {
            debug!("Rejected options form: {:?}", errors);
            let page = pages::options(&handle.session.csrf_token, form.crop.as_deref(), &errors);
            pages::html(page)
        }
    };

    Ok(with_session_cookie(response, handle.set_cookie()))
}

async fn predict(req: Request<Body>, app: &App) -> Result<Response<Body>, AppError> {
    let crop = app
        .sessions
        .get(req.headers())
        .await
        .and_then(|session| session.crop)
        .ok_or(AppError::NoCropSelected)?;

    let upload = uploads::read_upload(req, app.max_upload_bytes).await?;
    let filename = uploads::secure_filename(&upload.filename)
        .ok_or_else(|| AppError::InvalidFilename(upload.filename.clone()))?;

    let path = uploads::save(&app.uploads_dir, &filename, &upload.data).await?;
    info!("Saved {} bytes to {}", upload.data.len(), path.display());

    let registry = Arc::clone(&app.registry);
    let data = upload.data;
    let prediction =
        tokio::task::spawn_blocking(move || registry.predict(crop, &data)).await??;

    info!("{}: {} ({:.2}%)", filename, prediction.label, prediction.confidence);

    Ok(pages::text(StatusCode::OK, prediction.sentence()))
}
