//! Router tests: every request goes through `router(..).oneshot(..)` against
//! an in-memory `SqliteStore`.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use argon2::{
  Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use fluffy_core::{
  admin::AdminAllowlist,
  audit::{LogEntry, LogKind, NewLogEntry},
  link::{Link, LinkPatch, LinkReplacement, NewLink, OrderUpdate},
  store::ProfileStore,
  user::{Identity, ProfileChanges, Provisioned, User},
  visit::{VisitOutcome, VisitTarget},
};
use fluffy_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, BridgeAuth, Notification, Notifier, router};

const OWNER: &str = "owner-1";
const BRIDGE_USER: &str = "bridge";
const BRIDGE_PASS: &str = "bridge-secret";

// ─── Harness ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder(Mutex<Vec<Notification>>);

impl Notifier for Recorder {
  fn notify(&self, notification: Notification) {
    self.0.lock().unwrap().push(notification);
  }
}

impl Recorder {
  fn kinds(&self) -> Vec<LogKind> {
    self.0.lock().unwrap().iter().map(|n| n.kind).collect()
  }
}

fn bridge() -> BridgeAuth {
  // Cheap parameters; verification reads them back from the PHC string.
  let params = Params::new(8, 1, 1, None).unwrap();
  let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
  let salt = SaltString::generate(&mut OsRng);
  let hash = argon
    .hash_password(BRIDGE_PASS.as_bytes(), &salt)
    .unwrap()
    .to_string();
  BridgeAuth { username: BRIDGE_USER.to_string(), password_hash: hash }
}

fn state_with<S: ProfileStore>(store: S) -> (AppState<S>, Arc<Recorder>) {
  let notes = Arc::new(Recorder::default());
  let state = AppState {
    store:          Arc::new(store),
    admins:         Arc::new(AdminAllowlist::new(OWNER, vec!["admin-2".to_string()])),
    bridge:         Arc::new(bridge()),
    notifier:       notes.clone(),
    secure_cookies: false,
  };
  (state, notes)
}

async fn make_state() -> (AppState<SqliteStore>, Arc<Recorder>) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  state_with(store)
}

async fn oneshot_raw<S: ProfileStore + 'static>(
  state:   &AppState<S>,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, String)>,
  body:    Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap()
}

fn bearer(token: &str) -> Vec<(header::HeaderName, String)> {
  vec![(header::AUTHORIZATION, format!("Bearer {token}"))]
}

async fn json_of(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(resp: &Response) -> Option<String> {
  resp
    .headers()
    .get(header::SET_COOKIE)
    .map(|v| v.to_str().unwrap().to_string())
}

async fn login_resp<S: ProfileStore + 'static>(
  state: &AppState<S>,
  id: &str,
  name: &str,
) -> Response {
  let auth = format!("Basic {}", B64.encode(format!("{BRIDGE_USER}:{BRIDGE_PASS}")));
  oneshot_raw(
    state,
    "POST",
    "/auth/login",
    vec![(header::AUTHORIZATION, auth)],
    Some(json!({ "external_id": id, "display_name": name })),
  )
  .await
}

async fn login<S: ProfileStore + 'static>(state: &AppState<S>, id: &str, name: &str) -> String {
  let resp = login_resp(state, id, name).await;
  assert_eq!(resp.status(), StatusCode::OK);
  json_of(resp).await["token"].as_str().unwrap().to_string()
}

async fn add_link<S: ProfileStore + 'static>(
  state: &AppState<S>,
  token: &str,
  title: &str,
) -> Value {
  let resp = oneshot_raw(
    state,
    "POST",
    "/links",
    bearer(token),
    Some(json!({
      "platform": "youtube",
      "title": title,
      "url": format!("https://youtube.com/@{title}"),
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_of(resp).await
}

fn titles(body: &Value) -> Vec<String> {
  body["links"]
    .as_array()
    .unwrap()
    .iter()
    .map(|l| l["title"].as_str().unwrap().to_string())
    .collect()
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_provisions_then_refreshes() {
  let (state, notes) = make_state().await;

  let first = login_resp(&state, "42", "Cloud Fox").await;
  assert_eq!(first.status(), StatusCode::OK);
  let cookie = set_cookie(&first).unwrap();
  assert!(cookie.starts_with("fl_session="), "cookie: {cookie}");
  let body = json_of(first).await;
  assert_eq!(body["created"], true);
  assert_eq!(body["user"]["handle"], "Cloud_Fox");

  let second = json_of(login_resp(&state, "42", "Cloud Fox").await).await;
  assert_eq!(second["created"], false);
  assert_ne!(body["token"], second["token"]);

  assert_eq!(notes.kinds(), [LogKind::UserCreate, LogKind::Login]);
  let logs = state.store.list_logs(10).await.unwrap();
  let kinds: Vec<_> = logs.iter().map(|l| l.kind).collect();
  assert_eq!(kinds, [LogKind::Login, LogKind::UserCreate]);
}

#[tokio::test]
async fn login_requires_bridge_credentials() {
  let (state, _) = make_state().await;
  let wrong = format!("Basic {}", B64.encode(format!("{BRIDGE_USER}:nope")));
  let resp = oneshot_raw(
    &state,
    "POST",
    "/auth/login",
    vec![(header::AUTHORIZATION, wrong)],
    Some(json!({ "external_id": "42", "display_name": "fox" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json_of(resp).await["kind"], "unauthorized");
  assert!(state.store.get_user("42".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn session_by_bearer_or_cookie() {
  let (state, _) = make_state().await;
  let token = login(&state, "42", "fox").await;

  let resp = oneshot_raw(&state, "GET", "/me", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = oneshot_raw(&state, "GET", "/me", bearer("bogus"), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = oneshot_raw(&state, "GET", "/me", bearer(&token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let me = json_of(resp).await;
  assert_eq!(me["id"], "42");
  assert_eq!(me["links"], json!([]));

  let cookie = vec![(header::COOKIE, format!("fl_session={token}"))];
  let resp = oneshot_raw(&state, "GET", "/me", cookie, None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_ends_session() {
  let (state, notes) = make_state().await;
  let token = login(&state, "42", "fox").await;

  let resp = oneshot_raw(&state, "POST", "/auth/logout", bearer(&token), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(set_cookie(&resp).unwrap().contains("Max-Age=0"));

  let resp = oneshot_raw(&state, "GET", "/me", bearer(&token), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(notes.kinds().last(), Some(&LogKind::Logout));
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_update_and_handle_conflict() {
  let (state, _) = make_state().await;
  let a = login(&state, "1", "alpha").await;
  login(&state, "2", "beta").await;

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/profile",
    bearer(&a),
    Some(json!({ "handle": "Alpha Fox", "bio": "hello", "profileTag": "artist" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let user = json_of(resp).await;
  assert_eq!(user["handle"], "Alpha_Fox");
  assert_eq!(user["profileTag"], "artist");

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/profile",
    bearer(&a),
    Some(json!({ "handle": "BETA" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(json_of(resp).await["kind"], "handle_taken");

  let still = state.store.get_user("1".into()).await.unwrap().unwrap();
  assert_eq!(still.handle, "Alpha_Fox");
}

#[tokio::test]
async fn profile_rejects_empty_handle() {
  let (state, _) = make_state().await;
  let a = login(&state, "1", "alpha").await;
  let resp = oneshot_raw(
    &state,
    "PUT",
    "/profile",
    bearer(&a),
    Some(json!({ "handle": "!!!" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_of(resp).await["kind"], "invalid_handle");
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn link_lifecycle() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;

  add_link(&state, &token, "a").await;
  add_link(&state, &token, "b").await;
  add_link(&state, &token, "c").await;
  let body = add_link(&state, &token, "d").await;
  assert_eq!(titles(&body), ["a", "b", "c", "d"]);
  let b_id = body["links"][1]["id"].clone();

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/links",
    bearer(&token),
    Some(json!({ "id": b_id, "patch": { "platform": "x", "handle": "@fox" } })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(body["links"][1]["url"], "https://x.com/fox");
  assert_eq!(body["links"][1]["icon"], "x");

  let resp = oneshot_raw(
    &state,
    "DELETE",
    "/links",
    bearer(&token),
    Some(json!({ "id": b_id })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(titles(&body), ["a", "c", "d"]);
  let orders: Vec<_> = body["links"]
    .as_array()
    .unwrap()
    .iter()
    .map(|l| l["order"].as_u64().unwrap())
    .collect();
  assert_eq!(orders, [0, 1, 2]);
}

#[tokio::test]
async fn link_validation_errors() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;

  let resp = oneshot_raw(
    &state,
    "POST",
    "/links",
    bearer(&token),
    Some(json!({ "platform": "x", "title": "me" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_of(resp).await["kind"], "missing_input");

  let resp = oneshot_raw(
    &state,
    "POST",
    "/links",
    bearer(&token),
    Some(json!({ "platform": "other", "title": "t".repeat(61), "url": "https://a.b" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_of(resp).await["kind"], "invalid_input");
}

#[tokio::test]
async fn foreign_links_are_masked() {
  let (state, _) = make_state().await;
  let a = login(&state, "1", "alpha").await;
  let b = login(&state, "2", "beta").await;
  let mine = add_link(&state, &a, "mine").await;
  let theirs = add_link(&state, &b, "theirs").await;
  let mine_id = mine["links"][0]["id"].clone();
  let theirs_id = theirs["links"][0]["id"].clone();

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/links",
    bearer(&a),
    Some(json!({ "id": theirs_id, "patch": { "title": "stolen" } })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let entry = |id: &Value, title: &str| {
    json!({
      "id": id, "platform": "youtube", "title": title,
      "url": "https://youtube.com/@x", "order": 0,
    })
  };
  let resp = oneshot_raw(
    &state,
    "PUT",
    "/links/bulk",
    bearer(&a),
    Some(json!({ "links": [entry(&mine_id, "changed"), entry(&theirs_id, "hijacked")] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let me = json_of(oneshot_raw(&state, "GET", "/me", bearer(&a), None).await).await;
  assert_eq!(titles(&me), ["mine"]);

  let resp = oneshot_raw(
    &state,
    "POST",
    "/links/reorder",
    bearer(&a),
    Some(json!({ "orders": [{ "id": mine_id, "order": 1 }, { "id": theirs_id, "order": 0 }] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reorder_and_bulk_replace() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;
  add_link(&state, &token, "a").await;
  let body = add_link(&state, &token, "b").await;
  let a_id = body["links"][0]["id"].clone();
  let b_id = body["links"][1]["id"].clone();

  let resp = oneshot_raw(
    &state,
    "POST",
    "/links/reorder",
    bearer(&token),
    Some(json!({ "orders": [{ "id": a_id, "order": 1 }, { "id": b_id, "order": 0 }] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(titles(&json_of(resp).await), ["b", "a"]);

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/links/bulk",
    bearer(&token),
    Some(json!({ "links": [
      { "id": a_id, "platform": "instagram", "title": "gram", "url": "fox", "order": 0 },
      { "id": b_id, "platform": "youtube", "title": "tube", "url": "https://youtube.com/@b", "order": 1 },
    ] })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(titles(&body), ["gram", "tube"]);
  assert_eq!(body["links"][0]["url"], "https://www.instagram.com/fox/");
}

// ─── Visits ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_profile_counts_once_per_visitor() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "Alpha").await;
  add_link(&state, &token, "shown").await;

  let resp = oneshot_raw(&state, "GET", "/p/alpha", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cookie = set_cookie(&resp).expect("visitor cookie issued");
  let sid = cookie
    .strip_prefix("fl_sid=")
    .and_then(|s| s.split(';').next())
    .unwrap()
    .to_string();
  let page = json_of(resp).await;
  assert_eq!(page["handle"], "Alpha");
  assert_eq!(page["preset"]["id"], "pastel");
  assert_eq!(titles(&page), ["shown"]);

  let again = vec![(header::COOKIE, format!("fl_sid={sid}"))];
  let resp = oneshot_raw(&state, "GET", "/p/ALPHA", again, None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(set_cookie(&resp).is_none());

  let stats = json_of(oneshot_raw(&state, "GET", "/stats", bearer(&token), None).await).await;
  assert_eq!(stats["profileViews"], 1);

  oneshot_raw(&state, "GET", "/p/alpha", vec![], None).await;
  let stats = json_of(oneshot_raw(&state, "GET", "/stats", bearer(&token), None).await).await;
  assert_eq!(stats["profileViews"], 2);
}

#[tokio::test]
async fn private_or_missing_profile_is_404() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;
  oneshot_raw(
    &state,
    "PUT",
    "/profile",
    bearer(&token),
    Some(json!({ "isPublic": false })),
  )
  .await;

  let resp = oneshot_raw(&state, "GET", "/p/alpha", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let resp = oneshot_raw(&state, "GET", "/p/nobody", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn go_redirects_and_counts_clicks() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;
  let body = add_link(&state, &token, "tube").await;
  let id = body["links"][0]["id"].as_str().unwrap().to_string();

  let sid = vec![(header::COOKIE, "fl_sid=visitor-1".to_string())];
  let resp = oneshot_raw(&state, "GET", &format!("/go/{id}"), sid.clone(), None).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers()[header::LOCATION], "https://youtube.com/@tube");
  oneshot_raw(&state, "GET", &format!("/go/{id}"), sid, None).await;

  let stats = json_of(oneshot_raw(&state, "GET", "/stats", bearer(&token), None).await).await;
  assert_eq!(stats["counts"][&id], 1);

  let unknown = format!("/go/{}", Uuid::new_v4());
  for bad in ["/go/not-a-uuid", unknown.as_str()] {
    let resp = oneshot_raw(&state, "GET", bad, vec![], None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/");
  }
}

#[tokio::test]
async fn control_characters_never_reach_a_redirect() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;

  for link in [
    json!({ "platform": "x", "title": "t", "handle": "fo\u{1}o" }),
    json!({ "platform": "other", "title": "t", "url": "https://a.example/\u{0}" }),
  ] {
    let resp = oneshot_raw(&state, "POST", "/links", bearer(&token), Some(link)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  let body = add_link(&state, &token, "tube").await;
  let id = body["links"][0]["id"].as_str().unwrap().to_string();
  let resp = oneshot_raw(
    &state,
    "PUT",
    "/links",
    bearer(&token),
    Some(json!({ "id": id, "patch": { "url": "https://youtube.com/\u{7}" } })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = oneshot_raw(&state, "GET", &format!("/go/{id}"), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(resp.headers()[header::LOCATION], "https://youtube.com/@tube");
}

#[tokio::test]
async fn user_json_is_public() {
  let (state, _) = make_state().await;
  let token = login(&state, "1", "alpha").await;
  add_link(&state, &token, "a").await;

  let resp = oneshot_raw(&state, "GET", "/users/1", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(body["handleLower"], "alpha");
  assert_eq!(titles(&body), ["a"]);

  let resp = oneshot_raw(&state, "GET", "/users/ghost", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_surface_requires_allowlist() {
  let (state, _) = make_state().await;
  let user = login(&state, "1", "alpha").await;
  let admin = login(&state, "admin-2", "mod").await;

  let resp = oneshot_raw(&state, "GET", "/admin/users", bearer(&user), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = oneshot_raw(&state, "GET", "/admin/logs", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let resp = oneshot_raw(&state, "GET", "/admin/users", bearer(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let users = json_of(resp).await;
  assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_edits_and_deletes() {
  let (state, notes) = make_state().await;
  let user = login(&state, "1", "alpha").await;
  let admin = login(&state, OWNER, "owner").await;
  add_link(&state, &user, "a").await;
  let body = add_link(&state, &user, "b").await;
  let a_id = body["links"][0]["id"].as_str().unwrap().to_string();

  let resp = oneshot_raw(
    &state,
    "PUT",
    &format!("/admin/links/{a_id}"),
    bearer(&admin),
    Some(json!({ "title": "renamed", "platform": "other", "url": "https://a.example", "icon": "🦊" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(body["links"][0]["title"], "renamed");
  assert_eq!(body["links"][0]["icon"], "🦊");

  let resp = oneshot_raw(
    &state,
    "DELETE",
    &format!("/admin/links/{a_id}"),
    bearer(&admin),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_of(resp).await;
  assert_eq!(titles(&body), ["b"]);
  assert_eq!(body["links"][0]["order"], 0);

  let resp = oneshot_raw(
    &state,
    "PUT",
    "/admin/users/1",
    bearer(&admin),
    Some(json!({ "bio": "moderated" })),
  )
  .await;
  assert_eq!(json_of(resp).await["bio"], "moderated");

  let resp = oneshot_raw(&state, "DELETE", &format!("/admin/users/{OWNER}"), bearer(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = oneshot_raw(&state, "DELETE", "/admin/users/1", bearer(&admin), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  assert!(state.store.get_user("1".into()).await.unwrap().is_none());
  let resp = oneshot_raw(&state, "GET", "/me", bearer(&user), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let logs = json_of(
    oneshot_raw(&state, "GET", "/admin/logs?limit=1", bearer(&admin), None).await,
  )
  .await;
  assert_eq!(logs[0]["type"], "ADMIN_USER_DELETE");
  assert_eq!(logs[0]["targetUserId"], "1");

  let kinds = notes.kinds();
  for kind in [
    LogKind::AdminLinkUpdate,
    LogKind::AdminLinkDelete,
    LogKind::AdminUserUpdate,
    LogKind::AdminUserDelete,
  ] {
    assert!(kinds.contains(&kind), "missing {kind} notification");
  }
}

// ─── Best-effort audit ───────────────────────────────────────────────────────

/// Delegates to a real store but can never write the audit log.
struct BrokenLog(SqliteStore);

impl ProfileStore for BrokenLog {
  type Error = fluffy_store_sqlite::Error;

  async fn provision_user(&self, identity: Identity) -> Result<(User, Provisioned), Self::Error> { self.0.provision_user(identity).await }
  async fn get_user(&self, id: String) -> Result<Option<User>, Self::Error> { self.0.get_user(id).await }
  async fn get_user_by_handle(&self, h: String) -> Result<Option<User>, Self::Error> { self.0.get_user_by_handle(h).await }
  async fn list_users(&self) -> Result<Vec<User>, Self::Error> { self.0.list_users().await }
  async fn update_profile(&self, id: String, c: ProfileChanges) -> Result<User, Self::Error> { self.0.update_profile(id, c).await }
  async fn delete_user(&self, id: String) -> Result<(), Self::Error> { self.0.delete_user(id).await }
  async fn list_links(&self, id: String) -> Result<Vec<Link>, Self::Error> { self.0.list_links(id).await }
  async fn get_link(&self, id: Uuid) -> Result<Option<Link>, Self::Error> { self.0.get_link(id).await }
  async fn append_link(&self, id: String, l: NewLink) -> Result<Vec<Link>, Self::Error> { self.0.append_link(id, l).await }
  async fn update_link(&self, id: String, l: Uuid, p: LinkPatch) -> Result<Vec<Link>, Self::Error> { self.0.update_link(id, l, p).await }
  async fn replace_links(&self, id: String, l: Vec<LinkReplacement>) -> Result<Vec<Link>, Self::Error> { self.0.replace_links(id, l).await }
  async fn reorder_links(&self, id: String, o: Vec<OrderUpdate>) -> Result<Vec<Link>, Self::Error> { self.0.reorder_links(id, o).await }
  async fn delete_link(&self, id: String, l: Uuid) -> Result<Vec<Link>, Self::Error> { self.0.delete_link(id, l).await }
  async fn record_visit(&self, t: VisitTarget, s: Option<String>) -> Result<VisitOutcome, Self::Error> { self.0.record_visit(t, s).await }
  async fn count_visits(&self, t: Vec<VisitTarget>) -> Result<HashMap<VisitTarget, u64>, Self::Error> { self.0.count_visits(t).await }
  async fn list_logs(&self, n: usize) -> Result<Vec<LogEntry>, Self::Error> { self.0.list_logs(n).await }
  async fn create_session(&self, id: String, h: String) -> Result<(), Self::Error> { self.0.create_session(id, h).await }
  async fn session_user(&self, h: String) -> Result<Option<String>, Self::Error> { self.0.session_user(h).await }
  async fn delete_session(&self, h: String) -> Result<(), Self::Error> { self.0.delete_session(h).await }

  async fn append_log(&self, _: NewLogEntry) -> Result<LogEntry, Self::Error> {
    Err(tokio_rusqlite::Error::ConnectionClosed.into())
  }
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_mutation() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let (state, notes) = state_with(BrokenLog(store));

  let token = login(&state, "1", "alpha").await;
  let body = add_link(&state, &token, "still-created").await;
  assert_eq!(titles(&body), ["still-created"]);

  assert!(state.store.list_logs(10).await.unwrap().is_empty());
  assert_eq!(notes.kinds(), [LogKind::UserCreate]);
}
