use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::logos::{CUSTOM_PREFIX, DEFAULT_PREFIX};
use crate::models::{DayBucket, ScoreUpdate};
use crate::registry::LeagueEntry;
use crate::store::{LabelledSnapshot, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub updates: broadcast::Sender<ScoreUpdate>,
    pub entries: Vec<LeagueEntry>,
}

/// Build the Axum router for the display side.
pub fn router(state: AppState, logos_dir: &str, custom_logos_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/scores", get(scores_handler))
        .route("/api/scores/:day", get(day_scores_handler))
        .route("/api/leagues", get(leagues_handler))
        .route("/ws", get(ws_handler))
        .nest_service(&format!("/{DEFAULT_PREFIX}"), ServeDir::new(logos_dir))
        .nest_service(&format!("/{CUSTOM_PREFIX}"), ServeDir::new(custom_logos_dir))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(SCOREBOARD_HTML)
}

#[derive(Debug, Serialize)]
struct AllScores {
    today: Vec<LabelledSnapshot>,
    yesterday: Vec<LabelledSnapshot>,
}

/// GET /api/scores
async fn scores_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.read().await;
    Json(AllScores {
        today: store.read_all(DayBucket::Today),
        yesterday: store.read_all(DayBucket::Yesterday),
    })
}

/// GET /api/scores/{today|yesterday}
async fn day_scores_handler(
    State(state): State<Arc<AppState>>,
    Path(day): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let day = DayBucket::parse(&day)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown day bucket '{day}'")))?;
    let rows = state.store.read().await.read_all(day);
    Ok(Json(rows))
}

/// GET /api/leagues
async fn leagues_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.entries.clone())
}

/// GET /ws: one JSON `scoreUpdate` per message.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.updates.subscribe();
    ws.on_upgrade(move |socket| stream_updates(socket, rx))
}

async fn stream_updates(socket: WebSocket, mut rx: broadcast::Receiver<ScoreUpdate>) {
    let (mut write, mut read) = socket.split();
    loop {
        tokio::select! {
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Ok(update) => {
                        let Ok(text) = serde_json::to_string(&update) else { continue };
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Display client lagged, {} updates skipped", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Embedded single-file scoreboard (HTML + CSS + JS)
const SCOREBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>MyScoreboard</title>
<style>
  :root {
    --bg: #000;
    --card: #111;
    --border: #2a2d3a;
    --text: #e0e0e0;
    --muted: #8888aa;
    --live: #00c896;
    --delay: #ff9800;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; padding: 1rem; }
  h2 { font-size: .8rem; text-transform: uppercase; letter-spacing: .08em; color: var(--muted); margin: 1rem 0 .4rem; }
  .board { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: .6rem; }
  .game { background: var(--card); border: 1px solid var(--border); border-radius: 8px; padding: .6rem .8rem; }
  .team { display: flex; align-items: center; gap: .5rem; font-size: 1rem; }
  .team img { width: 28px; height: 28px; object-fit: contain; }
  .team .rank { color: var(--muted); font-size: .7rem; }
  .team .score { margin-left: auto; font-weight: 700; }
  .status { font-size: .8rem; color: var(--muted); margin-top: .3rem; }
  .IN_PROGRESS .status { color: var(--live); }
  .delayed .status { color: var(--delay); }
  .FINAL .team.loser { color: var(--muted); }
  .broadcast { display: flex; gap: .4rem; margin-top: .3rem; font-size: .7rem; color: var(--muted); align-items: center; }
  .broadcast img { height: 14px; }
  .broadcast img.invert { filter: invert(1); }
  .playoff { font-size: .7rem; color: var(--muted); }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
</style>
</head>
<body>
<div id="scores"><div class="empty">Waiting for scores…</div></div>
<script>
let homeFirst = new Set();

const ESCAPES = { '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' };
const esc = s => String(s ?? '').replace(/[&<>"']/g, c => ESCAPES[c]);

const logo = l => l.kind === 'absent' ? '' : `<img src="${esc(l.kind === 'local' ? '/' + l.src : l.src)}" alt="">`;

function teamRow(t, score, loser) {
  const rank = t.ranking ? `<span class="rank">${esc(t.ranking)}</span>` : '';
  const s = score == null ? '' : `<span class="score">${esc(score)}</span>`;
  return `<div class="team${loser ? ' loser' : ''}">${logo(t.logo)}${rank}<span>${esc(t.long_name)}</span>${s}</div>`;
}

function gameCard(g, league) {
  const started = g.phase !== 'SCHEDULED';
  const away = teamRow(g.away, started ? g.away_score : null, g.phase === 'FINAL' && g.away_score < g.home_score);
  const home = teamRow(g.home, started ? g.home_score : null, g.phase === 'FINAL' && g.home_score < g.away_score);
  const rows = homeFirst.has(league) ? home + away : away + home;
  const tv = g.broadcasts.map(b => b.icon
    ? `<img src="${esc(b.icon.startsWith('http') ? b.icon : '/' + b.icon)}" class="${b.invert_icon ? 'invert' : ''}" alt="${esc(b.channel)}">${esc(b.designation)}`
    : `${esc(b.channel)}${b.designation ? ' ' + esc(b.designation) : ''}`).join(' ');
  const playoff = g.playoff_status ? `<div class="playoff">${esc(g.playoff_status)}</div>` : '';
  return `<div class="game ${esc(g.phase)}${g.delayed ? ' delayed' : ''}">${playoff}${rows}
    <div class="status">${esc(g.status.join(' '))}</div><div class="broadcast">${tv}</div></div>`;
}

function renderBucket(title, rows) {
  const boards = rows.filter(r => r.snapshot.games.length > 0);
  if (boards.length === 0) return '';
  return `<h2>${title}</h2>` + boards.map(r =>
    `<h2>${esc(r.label)}</h2><div class="board">${r.snapshot.games.map(g => gameCard(g, r.snapshot.league)).join('')}</div>`
  ).join('');
}

async function loadLeagues() {
  const r = await fetch('/api/leagues');
  if (!r.ok) return;
  const entries = await r.json();
  homeFirst = new Set(entries.filter(e => e.info.caption === 'home_first').map(e => e.league));
}

async function loadScores() {
  const r = await fetch('/api/scores');
  if (!r.ok) return;
  const s = await r.json();
  const html = renderBucket('Yesterday', s.yesterday) + renderBucket('Today', s.today);
  document.getElementById('scores').innerHTML = html || '<div class="empty">No games</div>';
}

function listen() {
  const ws = new WebSocket((location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/ws');
  ws.onmessage = () => loadScores();
  ws.onclose = () => setTimeout(listen, 5000);
}

loadLeagues().then(loadScores);
listen();
setInterval(loadScores, 60000);
</script>
</body>
</html>"#;
