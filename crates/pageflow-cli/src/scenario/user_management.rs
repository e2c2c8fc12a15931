//! User management: background fetches, caching and store-driven views.
//!
//! - `home` shows who is logged in and reacts to theme changes.
//! - `profile` loads a user with stale-while-revalidate caching and logs
//!   the user in.
//! - `posts` loads a list with plain TTL caching.
//! - `settings` follows the current user and offers theme and logout actions.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::bail;
use pageflow_bridge::{CachePolicy, TaskError, TaskHandle};
use pageflow_router::{Params, View, ViewContext, data_sink, params};
use pageflow_store::{SharedStore, SubscriptionId, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Backend, DemoApp, settle};
use crate::container::{HeadlessContainer, Transcript};
use crate::settings::Settings;

pub const CURRENT_USER_KEY: &str = "current_user";
pub const AUTHENTICATED_KEY: &str = "authenticated";
pub const THEME_KEY: &str = "theme";

/// Highest user id the simulated service knows about.
pub const MAX_USER_ID: u64 = 100;

// =============================================================================
// SIMULATED SERVICE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub posts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
}

impl Backend {
    pub fn fetch_user(&self, user_id: u64) -> anyhow::Result<User> {
        self.round_trip(1.0);
        if user_id == 0 || user_id > MAX_USER_ID {
            bail!("no user with id {user_id}");
        }
        Ok(User {
            id: user_id,
            name: format!("User {user_id}"),
            email: format!("user{user_id}@example.com"),
            posts: user_id * 10,
        })
    }

    pub fn fetch_posts(&self) -> anyhow::Result<Vec<Post>> {
        self.round_trip(1.5);
        Ok((1..=5)
            .map(|id| Post {
                id,
                title: format!("Post {id}"),
                content: format!("Content for post {id}"),
            })
            .collect())
    }
}

fn report_error(
    transcript: &Transcript,
    what: &'static str,
) -> impl FnMut(TaskError) + 'static {
    let transcript = transcript.clone();
    move |error| {
        tracing::warn!(%error, "Could not load {what}");
        transcript.line(format!("Could not load {what}: {}", error.user_message()));
    }
}

fn user_name(store: &SharedStore) -> Option<String> {
    store
        .get_as::<User>(CURRENT_USER_KEY)
        .map(|user| user.name)
}

// =============================================================================
// HOME
// =============================================================================

struct HomeView {
    transcript: Transcript,
    store: SharedStore,
    subscription: SubscriptionId,
}

impl HomeView {
    fn new(container: &mut HeadlessContainer, context: &ViewContext) -> Box<dyn View> {
        let transcript = container.transcript().clone();
        let sink = transcript.clone();
        let subscription = context.store().subscribe(THEME_KEY, move |_, theme| {
            let theme = theme.as_str().unwrap_or("default");
            sink.line(format!("Home switches to the {theme} theme"));
        });
        Box::new(Self {
            transcript,
            store: Rc::clone(context.store()),
            subscription,
        })
    }
}

impl View for HomeView {
    fn on_enter(&mut self, _params: &Params) {
        let authenticated = self
            .store
            .get_as::<bool>(AUTHENTICATED_KEY)
            .unwrap_or(false);
        match user_name(&self.store) {
            Some(name) if authenticated => {
                self.transcript.line(format!("Logged in as: {name}"));
            }
            _ => self.transcript.line("Not logged in"),
        }
    }

    fn on_leave(&mut self) {}
}

impl Drop for HomeView {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

// =============================================================================
// PROFILE
// =============================================================================

struct ProfileView {
    this: Weak<RefCell<ProfileView>>,
    context: ViewContext,
    transcript: Transcript,
    backend: Backend,
    policy: CachePolicy,
    request: Option<TaskHandle>,
}

impl ProfileView {
    fn factory(
        backend: Backend,
        policy: CachePolicy,
    ) -> impl Fn(&mut HeadlessContainer, &ViewContext) -> Box<dyn View> + 'static {
        move |container: &mut HeadlessContainer, context: &ViewContext| -> Box<dyn View> {
            Box::new(Rc::new_cyclic(|this| {
                RefCell::new(ProfileView {
                    this: this.clone(),
                    context: context.clone(),
                    transcript: container.transcript().clone(),
                    backend: backend.clone(),
                    policy,
                    request: None,
                })
            }))
        }
    }
}

impl View for ProfileView {
    fn on_enter(&mut self, params: &Params) {
        let user_id = params.get("user_id").and_then(Value::as_u64).unwrap_or(1);
        self.transcript.line("Loading profile...");

        let Some(this) = self.this.upgrade() else {
            return;
        };
        let backend = self.backend.clone();
        self.request = Some(self.context.bridge().run_async_cached(
            format!("user_{user_id}"),
            self.policy,
            move || backend.fetch_user(user_id),
            data_sink::<_, User>(&this),
            report_error(&self.transcript, "profile"),
        ));
    }

    fn on_leave(&mut self) {
        if let Some(request) = self.request.take() {
            request.cancel();
        }
    }

    fn on_data_received(&mut self, data: &Value) {
        let user: User = match serde_json::from_value(data.clone()) {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(%error, "Unexpected profile payload");
                return;
            }
        };
        let store = self.context.store();
        store.set(CURRENT_USER_KEY, data.clone());
        store.set(AUTHENTICATED_KEY, true);

        self.transcript.line(format!("Name: {}", user.name));
        self.transcript.line(format!("Email: {}", user.email));
        self.transcript.line(format!("Total Posts: {}", user.posts));
    }
}

// =============================================================================
// POSTS
// =============================================================================

struct PostsView {
    this: Weak<RefCell<PostsView>>,
    context: ViewContext,
    transcript: Transcript,
    backend: Backend,
    policy: CachePolicy,
}

impl PostsView {
    fn factory(
        backend: Backend,
        policy: CachePolicy,
    ) -> impl Fn(&mut HeadlessContainer, &ViewContext) -> Box<dyn View> + 'static {
        move |container: &mut HeadlessContainer, context: &ViewContext| -> Box<dyn View> {
            Box::new(Rc::new_cyclic(|this| {
                RefCell::new(PostsView {
                    this: this.clone(),
                    context: context.clone(),
                    transcript: container.transcript().clone(),
                    backend: backend.clone(),
                    policy,
                })
            }))
        }
    }
}

impl View for PostsView {
    fn on_enter(&mut self, _params: &Params) {
        self.transcript.line("Loading posts...");
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let backend = self.backend.clone();
        self.context.bridge().run_async_cached(
            "posts_list",
            self.policy,
            move || backend.fetch_posts(),
            data_sink::<_, Vec<Post>>(&this),
            report_error(&self.transcript, "posts"),
        );
    }

    fn on_leave(&mut self) {}

    fn on_data_received(&mut self, data: &Value) {
        let posts: Vec<Post> = match serde_json::from_value(data.clone()) {
            Ok(posts) => posts,
            Err(error) => {
                tracing::warn!(%error, "Unexpected posts payload");
                return;
            }
        };
        for post in posts {
            self.transcript
                .line(format!("- {}: {}", post.title, post.content));
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

struct SettingsView {
    transcript: Transcript,
    store: SharedStore,
    subscription: SubscriptionId,
}

impl SettingsView {
    fn new(container: &mut HeadlessContainer, context: &ViewContext) -> Box<dyn View> {
        let transcript = container.transcript().clone();
        let sink = transcript.clone();
        let store = Rc::clone(context.store());
        let subscription = context.store().subscribe(CURRENT_USER_KEY, move |_, user| {
            sink.line(describe_user(user));
        });
        Box::new(Self {
            transcript,
            store,
            subscription,
        })
    }
}

fn describe_user(user: &Value) -> String {
    match user.get("name").and_then(Value::as_str) {
        Some(name) => format!("Current user: {name}"),
        None => "No user logged in".to_string(),
    }
}

impl View for SettingsView {
    fn on_enter(&mut self, _params: &Params) {
        let theme = self.store.get_or(THEME_KEY, "light");
        self.transcript
            .line(format!("Theme: {}", theme.as_str().unwrap_or("light")));
        let user = self.store.get_or(CURRENT_USER_KEY, Value::Null);
        self.transcript.line(describe_user(&user));
    }

    fn on_leave(&mut self) {}
}

impl Drop for SettingsView {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

/// The settings page's theme radio button.
pub fn select_theme(context: &ViewContext, theme: &str) {
    context.store().set(THEME_KEY, theme);
}

/// The settings page's logout button.
pub fn logout(context: &ViewContext) {
    let store = context.store();
    store.update([
        (AUTHENTICATED_KEY, json!(false)),
        (CURRENT_USER_KEY, Value::Null),
    ]);
    context.navigator().navigate("home", None);
}

// =============================================================================
// SCRIPT
// =============================================================================

pub(crate) fn run(
    app: &mut DemoApp,
    settings: &Settings,
    backend: &Backend,
) -> anyhow::Result<()> {
    let demo = &settings.demo;
    app.register_route("home", HomeView::new, None)?;
    app.register_route(
        "profile",
        ProfileView::factory(backend.clone(), demo.user_policy()),
        params(json!({"user_id": 1})),
    )?;
    app.register_route(
        "posts",
        PostsView::factory(backend.clone(), demo.posts_policy()),
        None,
    )?;
    app.register_route("settings", SettingsView::new, None)?;

    app.navigate("home", None)?;

    app.push("profile", params(json!({"user_id": 1})))?;
    settle(app, settings)?;
    app.pop();

    // The second visit is served from the cache.
    for _ in 0..2 {
        app.push("posts", None)?;
        settle(app, settings)?;
        app.pop();
    }

    app.push("profile", params(json!({"user_id": MAX_USER_ID + 1})))?;
    settle(app, settings)?;
    app.pop();

    app.push("settings", None)?;
    let context = app.controller().context().clone();
    select_theme(&context, "dark");
    logout(&context);
    settle(app, settings)?;
    Ok(())
}
