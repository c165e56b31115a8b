use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use serde_json::Value;
use studybud::{app, config::Config, db};
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> Router {
    let db_pool = db::connect("sqlite::memory:", 1).await.expect("open in-memory database");
    db::migrate(&db_pool).await.expect("run migrations");
    app(db_pool, &Config::default())
}

/// Sends requests against the app, carrying the session cookie like a browser.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    fn new(app: &Router) -> Self {
        Self { app: app.clone(), cookie: None }
    }

    async fn send(&mut self, mut req: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            req.headers_mut().insert(COOKIE, cookie.parse().unwrap());
        }
        let res = self.app.clone().oneshot(req).await.unwrap();
        if let Some(set_cookie) = res.headers().get(SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }
        res
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response {
        let req = Request::post(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_owned()))
            .unwrap();
        self.send(req).await
    }

    async fn register(&mut self, username: &str) {
        let form = format!(
            "email={username}%40example.com&username={username}&password1=password123&password2=password123"
        );
        let res = self.post("/register", &form).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
    }

    async fn rooms(&mut self) -> Vec<Value> {
        let res = self.get("/api/rooms/").await;
        assert_eq!(res.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&text(res).await).unwrap();
        json.as_array().unwrap().clone()
    }
}

fn location(res: &Response) -> &str {
    res.headers().get(LOCATION).unwrap().to_str().unwrap()
}

async fn text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn home_renders_for_guests() {
    let app = test_app().await;
    let mut guest = Client::new(&app);

    let res = guest.get("/").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = text(res).await;
    assert!(body.contains("Study rooms"));
    assert!(body.contains("0 rooms available"));
}

#[tokio::test]
async fn guests_are_sent_to_login() {
    let app = test_app().await;
    let mut guest = Client::new(&app);

    let res = guest.get("/room/create").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?return_url=/room/create");

    let res = guest.post("/room/create", "room_topic=Math&name=Calculus").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with("/login"));

    let res = guest.get("/update-user").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with("/login"));

    assert!(guest.rooms().await.is_empty());
}

#[tokio::test]
async fn created_room_is_listed_and_searchable() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;

    let res = ada.post("/room/create", "room_topic=Math&name=Calculus&description=Limits").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let rooms = ada.rooms().await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["name"], "Calculus");
    assert_eq!(rooms[0]["description"], "Limits");
    assert!(rooms[0]["participants"].as_array().unwrap().is_empty());

    let mut guest = Client::new(&app);
    let body = text(guest.get("/?q=MATH").await).await;
    assert!(body.contains("Calculus"));
    let body = text(guest.get("/?q=physics").await).await;
    assert!(!body.contains("Calculus"));

    let body = text(guest.get("/topics?q=ma").await).await;
    assert!(body.contains("Math"));
}

#[tokio::test]
async fn invalid_room_form_is_rejected() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;

    let res = ada.post("/room/create", "room_topic=&name=Calculus").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(text(res).await.contains("Topic is required"));
    assert!(ada.rooms().await.is_empty());
}

#[tokio::test]
async fn only_the_host_edits_or_deletes_a_room() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    let mut bob = Client::new(&app);
    ada.register("ada").await;
    bob.register("bob").await;

    ada.post("/room/create", "room_topic=Math&name=Calculus").await;
    let room_id = ada.rooms().await[0]["id"].as_str().unwrap().to_owned();

    let res = bob.get(&format!("/room/{room_id}/update")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = bob.post(&format!("/room/{room_id}/update"), "room_topic=Art&name=Mine").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(text(res).await.contains("Permission denied!"));
    let res = bob.post(&format!("/room/{room_id}/delete"), "").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(ada.rooms().await[0]["name"], "Calculus");

    let res = ada.post(&format!("/room/{room_id}/update"), "room_topic=Math&name=Limits").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(ada.rooms().await[0]["name"], "Limits");

    let res = ada.post(&format!("/room/{room_id}/delete"), "").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(ada.rooms().await.is_empty());
}

#[tokio::test]
async fn posting_a_message_joins_the_room() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    let mut bob = Client::new(&app);
    ada.register("ada").await;
    bob.register("bob").await;

    ada.post("/room/create", "room_topic=Math&name=Calculus").await;
    let room_id = ada.rooms().await[0]["id"].as_str().unwrap().to_owned();
    let room_url = format!("/room/{room_id}");

    let res = bob.post(&room_url, "body=What+is+a+limit%3F").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), room_url);

    let rooms = bob.rooms().await;
    assert_eq!(rooms[0]["participants"].as_array().unwrap().len(), 1);

    let mut guest = Client::new(&app);
    let res = guest.get(&room_url).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(text(res).await.contains("What is a limit?"));

    let res = guest.post(&room_url, "body=hello").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(location(&res).starts_with("/login"));

    let res = ada.post(&format!("/message/{}/delete", Uuid::now_v7()), "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn register_and_login_report_form_errors() {
    let app = test_app().await;
    let mut ada = Client::new(&app);

    let res = ada
        .post("/register", "email=ada%40example.com&username=ada&password1=password123&password2=password321")
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(text(res).await.contains("password fields didn"));

    ada.register("ada").await;
    let res = ada.get("/logout").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let mut other = Client::new(&app);
    let res = other.post("/login", "email=nobody%40example.com&password=password123").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(text(res).await.contains("User does not exist"));

    let res = other.post("/login", "email=ada%40example.com&password=wrong-password").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(text(res).await.contains("Incorrect password"));

    let res = other
        .post("/login", "email=ada%40example.com&password=password123&return_url=%2Froom%2Fcreate")
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/room/create");
    assert_eq!(other.get("/room/create").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_rooms_and_users_are_not_found() {
    let app = test_app().await;
    let mut guest = Client::new(&app);

    assert_eq!(guest.get(&format!("/room/{}", Uuid::now_v7())).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(guest.get(&format!("/profile/{}", Uuid::now_v7())).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_index_lists_endpoints() {
    let app = test_app().await;
    let mut guest = Client::new(&app);

    let res = guest.get("/api/").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&text(res).await).unwrap();
    assert_eq!(json["FBV"], "rooms/");
    assert_eq!(json["CBV"], "rooms-class/");

    assert_eq!(guest.get("/api/rooms-class/").await.status(), StatusCode::OK);
}

/// The id in the first `/{kind}/{id}/delete` link on a page.
fn delete_link_id<'a>(body: &'a str, kind: &str) -> &'a str {
    let prefix = format!("/{kind}/");
    let start = body.find(&prefix).unwrap() + prefix.len();
    let rest = &body[start..];
    &rest[..rest.find("/delete").unwrap()]
}

#[tokio::test]
async fn author_deletes_own_message() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;

    ada.post("/room/create", "room_topic=Math&name=Calculus").await;
    let room_id = ada.rooms().await[0]["id"].as_str().unwrap().to_owned();
    let room_url = format!("/room/{room_id}");
    ada.post(&room_url, "body=first+draft").await;

    let page = text(ada.get(&room_url).await).await;
    let message_id = delete_link_id(&page, "message").to_owned();

    let res = ada.get(&format!("/message/{message_id}/delete")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(text(res).await.contains("first draft"));

    let res = ada.post(&format!("/message/{message_id}/delete"), "").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), room_url);
    assert!(!text(ada.get(&room_url).await).await.contains("first draft"));
}

#[tokio::test]
async fn profile_edit_shows_on_profile_page() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;

    let res = ada.get("/update-user").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = ada
        .post("/update-user", "username=Lovelace&email=ada%40example.com&avatar=&bio=Analytical+engines")
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let profile_url = location(&res).to_owned();
    assert!(profile_url.starts_with("/profile/"));

    let body = text(ada.get(&profile_url).await).await;
    assert!(body.contains("@lovelace"));
    assert!(body.contains("Analytical engines"));
    assert!(body.contains("Edit profile"));

    let mut guest = Client::new(&app);
    let res = guest.get(&profile_url).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!text(res).await.contains(r#"href="/update-user""#));
}

#[tokio::test]
async fn activity_lists_recent_messages() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;
    ada.post("/room/create", "room_topic=Math&name=Calculus").await;
    let room_id = ada.rooms().await[0]["id"].as_str().unwrap().to_owned();
    ada.post(&format!("/room/{room_id}"), "body=limits+are+fun").await;

    let mut guest = Client::new(&app);
    let res = guest.get("/activity").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = text(res).await;
    assert!(body.contains("limits are fun"));
    assert!(body.contains("Calculus"));
}

#[tokio::test]
async fn login_page_sends_members_away() {
    let app = test_app().await;
    let mut ada = Client::new(&app);

    assert_eq!(ada.get("/login").await.status(), StatusCode::OK);

    ada.register("ada").await;
    let res = ada.get("/login").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = ada.get("/login?return_url=/activity").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/activity");
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = test_app().await;
    let mut ada = Client::new(&app);
    ada.register("ada").await;

    for uri in ["/room/abc", "/profile/abc", "/room/abc/update", "/message/abc/delete"] {
        let res = ada.get(uri).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }
    let res = ada.post("/room/abc/delete", "").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
