use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, header, redirect};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    backend_configured: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct TaskBody {
    id: String,
    completed: bool,
    points: u32,
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    total_points: u64,
    level: u32,
    completed_tasks: u64,
    current_streak: u32,
    unlocked_achievements: Vec<String>,
    subscription_plan: String,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    task: TaskBody,
    profile: ProfileBody,
    newly_unlocked: Vec<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for &pid in pids.iter() {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{nanos}", std::process::id())
}

fn unique_data_path() -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("seiton_http_{}.json", unique_suffix()));
    path.to_string_lossy().to_string()
}

fn unique_email(tag: &str) -> String {
    format!("{tag}_{}@example.com", unique_suffix())
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(data_path: Option<String>) -> TestServer {
    let port = pick_free_port();
    let mut command = Command::new(env!("CARGO_BIN_EXE_seiton"));
    command
        .env("PORT", port.to_string())
        .env("RUST_LOG", "info")
        .env_remove("SEITON_DATA_PATH")
        .env_remove("SEITON_ENV")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(path) = data_path {
        command.env("SEITON_DATA_PATH", path);
    }
    let child = command.spawn().expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(Some(unique_data_path())).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn sign_up(client: &Client, base_url: &str, tag: &str) -> AuthResponse {
    let response = client
        .post(format!("{base_url}/api/auth/signup"))
        .json(&serde_json::json!({ "email": unique_email(tag), "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn sign_in(client: &Client, base_url: &str, email: &str, password: &str) -> StatusCode {
    client
        .post(format!("{base_url}/api/auth/signin"))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
        .status()
}

async fn create_task(client: &Client, base_url: &str, token: &str, title: &str) {
    let response = client
        .post(format!("{base_url}/api/tasks"))
        .bearer_auth(token)
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn http_health_reports_backend() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let health: HealthResponse = Client::new()
        .get(format!("{}/api/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");
    assert!(health.backend_configured);
}

#[tokio::test]
async fn http_completing_first_task_awards_sixty_points() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let auth = sign_up(&client, &server.base_url, "first").await;

    let response = client
        .post(format!("{}/api/tasks", server.base_url))
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({ "title": "Open the shop" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let task: TaskBody = response.json().await.unwrap();
    assert!(!task.completed);
    assert_eq!(task.points, 10);

    let toggled: ToggleBody = client
        .post(format!("{}/api/tasks/{}/toggle", server.base_url, task.id))
        .bearer_auth(&auth.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(toggled.task.completed);
    assert_eq!(toggled.profile.total_points, 60);
    assert_eq!(toggled.profile.completed_tasks, 1);
    assert_eq!(toggled.profile.level, 1);
    assert_eq!(toggled.profile.current_streak, 1);
    assert_eq!(toggled.profile.unlocked_achievements, ["first-task"]);
    assert_eq!(toggled.newly_unlocked, ["first-task"]);

    // Un-completing only takes back the task's own points.
    let reopened: ToggleBody = client
        .post(format!("{}/api/tasks/{}/toggle", server.base_url, task.id))
        .bearer_auth(&auth.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!reopened.task.completed);
    assert_eq!(reopened.profile.total_points, 50);
    assert_eq!(reopened.profile.completed_tasks, 0);
    assert!(reopened.newly_unlocked.is_empty());
}

#[tokio::test]
async fn http_requires_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/profile", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/api/tasks", server.base_url))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_tasks_are_private_to_their_owner() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let owner = sign_up(&client, &server.base_url, "owner").await;
    let other = sign_up(&client, &server.base_url, "other").await;

    let task: TaskBody = client
        .post(format!("{}/api/tasks", server.base_url))
        .bearer_auth(&owner.token)
        .json(&serde_json::json!({ "title": "Count the till" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/tasks/{}/toggle", server.base_url, task.id))
        .bearer_auth(&other.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let visible: Vec<serde_json::Value> = client
        .get(format!("{}/api/tasks", server.base_url))
        .bearer_auth(&other.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(visible.is_empty());
}

#[tokio::test]
async fn http_finance_requires_premium() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let auth = sign_up(&client, &server.base_url, "finance").await;
    let sale = serde_json::json!({ "type": "income", "amount": 120.5, "description": "Sale" });

    let response = client
        .post(format!("{}/api/transactions", server.base_url))
        .bearer_auth(&auth.token)
        .json(&sale)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/api/subscription", server.base_url))
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({ "plan": "premium", "months": 1 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let subscription: serde_json::Value = response.json().await.unwrap();
    assert_eq!(subscription["plan"], "premium");
    assert_eq!(subscription["active"], true);

    let response = client
        .post(format!("{}/api/transactions", server.base_url))
        .bearer_auth(&auth.token)
        .json(&sale)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let dashboard: serde_json::Value = client
        .get(format!("{}/api/dashboard", server.base_url))
        .bearer_auth(&auth.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["finance"]["totals"]["balance"], 120.5);

    let profile: ProfileBody = client
        .get(format!("{}/api/profile", server.base_url))
        .bearer_auth(&auth.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile.subscription_plan, "premium");
}

#[tokio::test]
async fn http_duplicate_email_and_bad_password() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let auth = sign_up(&client, &server.base_url, "dupe").await;

    let response = client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&serde_json::json!({ "email": auth.email, "password": "another-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .post(format!("{}/api/auth/signin", server.base_url))
        .json(&serde_json::json!({ "email": auth.email, "password": "wrong-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{}/api/auth/signin", server.base_url))
        .json(&serde_json::json!({ "email": auth.email, "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn http_pages_redirect_to_login_and_set_cookie() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    let response = client
        .get(format!("{}/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = client
        .post(format!("{}/signup", server.base_url))
        .form(&[("email", unique_email("form")), ("password", "secret-pass".to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("seiton_session="));

    let response = client
        .get(format!("{}/dashboard", server.base_url))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Upcoming tasks"));

    let response = client
        .post(format!("{}/planner/tasks", server.base_url))
        .header(header::COOKIE, &cookie)
        .form(&[("title", ""), ("date", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.ends_with("notice=invalid-input"), "{location}");
}

#[tokio::test]
async fn http_unknown_page_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;

    let response = Client::new()
        .get(format!("{}/nope", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Page not found"));
}

#[tokio::test]
async fn http_without_data_path_reports_unavailable() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(None).await;
    let client = Client::new();

    let health: HealthResponse = client
        .get(format!("{}/api/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!health.backend_configured);

    let response = client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&serde_json::json!({ "email": unique_email("nobackend"), "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client
        .get(format!("{}/api/profile", server.base_url))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn http_password_change_checks_input_and_revokes_other_sessions() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let auth = sign_up(&client, &server.base_url, "passwd").await;
    let url = format!("{}/api/account/password", server.base_url);

    let rejected = [
        ("wrong-pass", "brand-new-pass", "brand-new-pass", StatusCode::UNAUTHORIZED),
        ("secret-pass", "brand-new-pass", "other-new-pass", StatusCode::BAD_REQUEST),
        ("secret-pass", "short", "short", StatusCode::BAD_REQUEST),
    ];
    for (current, new, confirm, status) in rejected {
        let response = client
            .put(&url)
            .bearer_auth(&auth.token)
            .json(&serde_json::json!({
                "current_password": current,
                "new_password": new,
                "confirm_password": confirm,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), status, "{current} / {new} / {confirm}");
    }
    assert_eq!(
        sign_in(&client, &server.base_url, &auth.email, "secret-pass").await,
        StatusCode::OK
    );

    let second: AuthResponse = client
        .post(format!("{}/api/auth/signin", server.base_url))
        .json(&serde_json::json!({ "email": auth.email, "password": "secret-pass" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .put(&url)
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({
            "current_password": "secret-pass",
            "new_password": "brand-new-pass",
            "confirm_password": "brand-new-pass",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        sign_in(&client, &server.base_url, &auth.email, "secret-pass").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        sign_in(&client, &server.base_url, &auth.email, "brand-new-pass").await,
        StatusCode::OK
    );

    let profile_url = format!("{}/api/profile", server.base_url);
    let response = client.get(&profile_url).bearer_auth(&auth.token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = client.get(&profile_url).bearer_auth(&second.token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_email_change_requires_password_and_a_free_address() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let auth = sign_up(&client, &server.base_url, "mover").await;
    let taken = sign_up(&client, &server.base_url, "taken").await;
    let url = format!("{}/api/account/email", server.base_url);

    let response = client
        .put(&url)
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({ "current_password": "secret-pass", "new_email": taken.email }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let new_email = unique_email("moved");
    let response = client
        .put(&url)
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({ "current_password": "wrong-pass", "new_email": new_email }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .put(&url)
        .bearer_auth(&auth.token)
        .json(&serde_json::json!({ "current_password": "secret-pass", "new_email": new_email }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        sign_in(&client, &server.base_url, &new_email, "secret-pass").await,
        StatusCode::OK
    );
    assert_eq!(
        sign_in(&client, &server.base_url, &auth.email, "secret-pass").await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn http_live_feed_only_carries_the_callers_changes() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let watcher = sign_up(&client, &server.base_url, "watcher").await;
    let stranger = sign_up(&client, &server.base_url, "stranger").await;

    let mut live = client
        .get(format!("{}/api/live", server.base_url))
        .bearer_auth(&watcher.token)
        .send()
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert!(
        live.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    create_task(&client, &server.base_url, &stranger.token, "Not yours").await;
    create_task(&client, &server.base_url, &watcher.token, "Yours").await;

    let mut buffer = String::new();
    let event = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(end) = buffer.find("\n\n") {
                let block: String = buffer.drain(..end + 2).collect();
                // Keep-alive comments start with ':'.
                if block.lines().any(|line| line.starts_with("event:")) {
                    return block;
                }
                continue;
            }
            let chunk = live.chunk().await.unwrap().expect("live stream ended");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .expect("no live event within 5s");

    assert!(
        event
            .lines()
            .any(|line| line.strip_prefix("event:").map(str::trim) == Some("tasks")),
        "{event}"
    );
    assert!(event.contains(&watcher.user_id), "{event}");
    assert!(!event.contains(&stranger.user_id), "{event}");
}
