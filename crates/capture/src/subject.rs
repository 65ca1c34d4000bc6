//! Units of work that can be profiled.
//!
//! Each subject knows the components it is matched on, the name of its span
//! and the attributes that describe it.

use perfgate_core::SubjectKind;

/// Route resolved for an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteInfo {
    /// Route template, e.g. `users/{id}`
    pub uri: String,
    /// Handler, e.g. `App\Http\Controllers\UserController@show`
    pub action: Option<String>,
    /// Methods the route answers
    pub methods: Vec<String>,
}

/// An HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpSubject {
    /// Request method
    pub method: String,
    /// Request path, with or without a leading `/`
    pub path: String,
    /// Full URL including the query string
    pub full_url: String,
    /// Matched route, if any
    pub route: Option<RouteInfo>,
    /// Authenticated user id
    pub user: Option<String>,
}

impl HttpSubject {
    /// Request with no route or user.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: method.into(),
            full_url: with_slash(&path),
            path,
            route: None,
            user: None,
        }
    }

    /// Attach the matched route.
    pub fn with_route(mut self, route: RouteInfo) -> Self {
        self.route = Some(route);
        self
    }

    /// Attach the authenticated user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn components(&self) -> Vec<String> {
        let path = self.path.trim_start_matches('/');
        let slashed = with_slash(path);
        let mut out = vec![
            format!("{} {}", self.method, slashed),
            format!("{} {}", self.method, path),
            path.to_string(),
            slashed,
        ];
        if let Some(route) = &self.route {
            let uri = with_slash(&route.uri);
            if let Some(action) = &route.action {
                out.push(action.clone());
            }
            out.push(route.uri.clone());
            out.push(uri.clone());
            if let Some(action) = &route.action {
                let class = action.split('@').next().unwrap_or(action);
                out.push(class.to_string());
            }
            for method in &route.methods {
                out.push(format!("{} {}", method, route.uri));
                out.push(format!("{} {}", method, uri));
            }
        }
        out
    }
}

/// A console command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleSubject {
    /// Command name, e.g. `migrate:fresh`
    pub command: String,
}

/// A queued job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSubject {
    /// Job name, usually a fully qualified class
    pub job: String,
    /// Queue name
    pub queue: String,
    /// Connection name
    pub connection: String,
    /// Job id assigned by the queue
    pub job_id: Option<String>,
    /// Attempts so far
    pub attempts: u32,
}

/// A unit of work that may be profiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// HTTP request
    Http(HttpSubject),
    /// Console command
    Console(ConsoleSubject),
    /// Queued job
    Queue(QueueSubject),
    /// Scheduled task, by name
    Schedule(String),
    /// Reported exception, by class
    Exception(String),
}

impl Subject {
    /// Console command subject.
    pub fn console(command: impl Into<String>) -> Self {
        Subject::Console(ConsoleSubject {
            command: command.into(),
        })
    }

    /// Queued job subject with no queue metadata.
    pub fn queue(job: impl Into<String>) -> Self {
        Subject::Queue(QueueSubject {
            job: job.into(),
            ..QueueSubject::default()
        })
    }

    /// Filter family of this subject.
    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Http(_) => SubjectKind::Http,
            Subject::Console(_) => SubjectKind::Console,
            Subject::Queue(_) => SubjectKind::Queue,
            Subject::Schedule(_) => SubjectKind::Schedule,
            Subject::Exception(_) => SubjectKind::Exception,
        }
    }

    /// Strings include/exclude filters are matched against.
    pub fn components(&self) -> Vec<String> {
        match self {
            Subject::Http(http) => http.components(),
            Subject::Console(console) => vec![console.command.clone()],
            Subject::Queue(queue) => {
                let base = class_basename(&queue.job);
                if base == queue.job {
                    vec![queue.job.clone()]
                } else {
                    vec![queue.job.clone(), base.to_string()]
                }
            }
            Subject::Schedule(name) | Subject::Exception(name) => vec![name.clone()],
        }
    }

    /// Span name, `{kind}.{identifier}`.
    pub fn span_name(&self) -> String {
        let identifier = match self {
            Subject::Http(http) => {
                let path = http.route.as_ref().map_or(&http.path, |r| &r.uri);
                format!("{}.{}", http.method, with_slash(path))
            }
            Subject::Console(console) => console.command.clone(),
            Subject::Queue(queue) => class_basename(&queue.job).to_string(),
            Subject::Schedule(name) => name.clone(),
            Subject::Exception(class) => class_basename(class).to_string(),
        };
        format!("{}.{}", self.kind(), identifier)
    }

    /// Attributes describing the subject, attached when the span starts.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = vec![("source", self.kind().as_str().to_string())];
        match self {
            Subject::Http(http) => {
                let action = match &http.route {
                    Some(route) => format!("{} {}", http.method, route.uri),
                    None => "Unknown HTTP Action".to_string(),
                };
                attrs.push(("action", action));
                attrs.push(("http_method", http.method.clone()));
                attrs.push(("http_url", http.full_url.clone()));
                if let Some(user) = &http.user {
                    attrs.push(("user", user.clone()));
                }
            }
            Subject::Console(console) => {
                attrs.push(("action", console.command.clone()));
            }
            Subject::Queue(queue) => {
                attrs.push(("action", queue.job.clone()));
                attrs.push(("queue", queue.queue.clone()));
                attrs.push(("connection", queue.connection.clone()));
                attrs.push(("job_id", queue.job_id.clone().unwrap_or_default()));
                attrs.push(("attempts", queue.attempts.to_string()));
            }
            Subject::Schedule(name) | Subject::Exception(name) => {
                attrs.push(("action", name.clone()));
            }
        }
        attrs
    }
}

impl From<HttpSubject> for Subject {
    fn from(s: HttpSubject) -> Self {
        Subject::Http(s)
    }
}

impl From<QueueSubject> for Subject {
    fn from(s: QueueSubject) -> Self {
        Subject::Queue(s)
    }
}

fn with_slash(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Last segment of a namespaced class name.
fn class_basename(name: &str) -> &str {
    let after_backslash = name.rsplit('\\').next().unwrap_or(name);
    after_backslash.rsplit("::").next().unwrap_or(after_backslash)
}
