//! Per-request mutable state.
//!
//! A `Context` is created fresh for every request; nothing on it is
//! safe to share across concurrent requests (§5). The compiled
//! subroutine map and the `Program` it was built from are the only
//! state shared read-only across requests.

use std::collections::HashMap;

use crate::ast::{AclDecl, BackendDecl, DirectorDecl, Program, TableDecl};
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostic;
use crate::header_map::HeaderMap;
use crate::value::Value;

/// One of the five HTTP-object namespaces (`req`, `bereq`, `beresp`,
/// `resp`, `obj`): a header map plus a bag of named scalar fields
/// (status, response, ttl, ...).
#[derive(Debug, Clone, Default)]
pub struct HttpObject {
    pub http: HeaderMap,
    pub scalars: HashMap<String, Value>,
}

impl HttpObject {
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.scalars.get(name)
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: Value) {
        self.scalars.insert(name.into(), value);
    }
}

/// A named registry, used identically for backends, directors, ACLs
/// and tables: insertion-ordered, unique by name.
#[derive(Debug, Clone, Default)]
pub struct Registry<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, item: T) {
        let name = name.into();
        if !self.items.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.items.insert(name, item);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.items.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.order
            .iter()
            .filter_map(move |name| self.items.get(name).map(|item| (name.as_str(), item)))
    }
}

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub hostname: String,
    pub identity: String,
    pub datacenter: String,
    pub region: String,
    pub pop: String,
    pub billing_region: String,
    pub ip: String,
    pub port: u16,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            identity: "cache-local".to_string(),
            datacenter: "DC1".to_string(),
            region: "North America".to_string(),
            pop: "LOC".to_string(),
            billing_region: "US".to_string(),
            ip: "127.0.0.1".to_string(),
            port: 80,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub port: u16,
    pub identity: String,
    pub requests: i64,
    pub country_code: String,
    pub continent_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 0,
            identity: String::new(),
            requests: 1,
            country_code: "US".to_string(),
            continent_code: "NA".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
        }
    }
}

/// Per-request state: the five HTTP-object namespaces, locals, regex
/// capture groups, the four registries, and the assorted read-only
/// derived surfaces the evaluator exposes.
#[derive(Debug, Clone)]
pub struct Context {
    pub req: HttpObject,
    pub bereq: HttpObject,
    pub beresp: HttpObject,
    pub resp: HttpObject,
    pub obj: HttpObject,

    pub locals: HashMap<String, Value>,
    pub re_groups: Vec<String>,

    pub backends: Registry<BackendDecl>,
    pub directors: Registry<DirectorDecl>,
    pub acls: Registry<AclDecl>,
    pub tables: Registry<TableDecl>,
    pub current_backend: Option<String>,

    pub client: ClientInfo,
    pub server: ServerInfo,

    /// Opaque fingerprint → cached object map; never interpreted by
    /// the core (real storage is an external collaborator).
    pub cache: HashMap<String, Value>,
    /// Ordered hex digests accumulated by `hash_data` during `vcl_hash`.
    pub hash_data: Vec<String>,

    /// Zero-valued registry entries for each declared `Ratecounter`,
    /// seeded by `from_program` (§5: "For each Penaltybox and
    /// Ratecounter: initialize zero-valued registry entries under the
    /// ratelimit namespace"). Only names present here are tracked by
    /// `ratelimit.*`; an undeclared name is a no-op, not silently
    /// equivalent to a declared one.
    pub ratecounters: HashMap<String, i64>,
    /// Declared `Penaltybox` names, each seeded with an empty entry
    /// set, per the same §5 requirement.
    pub penaltyboxes: HashMap<String, std::collections::HashSet<String>>,

    pub diagnostics: Vec<Diagnostic>,

    pub config: EngineConfig,

    /// Escape hatch for read-only derived surfaces not otherwise
    /// modeled as a dedicated field (e.g. `waf.*`, `fastly_info.*`):
    /// checked by the evaluator before falling back to a documented
    /// default. Keyed by the full dotted path.
    pub overrides: HashMap<String, Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            req: HttpObject::default(),
            bereq: HttpObject::default(),
            beresp: HttpObject::default(),
            resp: HttpObject::default(),
            obj: HttpObject::default(),
            locals: HashMap::new(),
            re_groups: Vec::new(),
            backends: Registry::new(),
            directors: Registry::new(),
            acls: Registry::new(),
            tables: Registry::new(),
            current_backend: None,
            client: ClientInfo::default(),
            server: ServerInfo::default(),
            cache: HashMap::new(),
            hash_data: Vec::new(),
            ratecounters: HashMap::new(),
            penaltyboxes: HashMap::new(),
            diagnostics: Vec::new(),
            config: EngineConfig::default(),
            overrides: HashMap::new(),
        }
    }
}

impl Context {
    pub fn new() -> Self {
        let mut ctx = Self::default();
        ctx.req.set_scalar("restarts", Value::Integer(0));
        ctx
    }

    /// Build a fresh per-request Context seeded from a compiled
    /// program's template registries (ACLs/backends/directors/tables
    /// are read-mostly and merged in at request start; see §5).
    pub fn from_program(program: &Program, config: EngineConfig) -> Self {
        let mut ctx = Self::new();
        ctx.config = config;

        for acl in &program.acls {
            ctx.acls.insert(acl.name.clone(), acl.clone());
        }
        for backend in &program.backends {
            ctx.backends.insert(backend.name.clone(), backend.clone());
        }
        for director in &program.directors {
            ctx.directors.insert(director.name.clone(), director.clone());
        }
        for table in &program.tables {
            ctx.tables.insert(table.name.clone(), table.clone());
        }
        for ratecounter in &program.ratecounters {
            ctx.ratecounters.insert(ratecounter.clone(), 0);
        }
        for penaltybox in &program.penaltyboxes {
            ctx.penaltyboxes.insert(penaltybox.clone(), std::collections::HashSet::new());
        }

        ctx
    }

    pub fn namespace(&self, ns: &str) -> Option<&HttpObject> {
        match ns {
            "req" => Some(&self.req),
            "bereq" => Some(&self.bereq),
            "beresp" => Some(&self.beresp),
            "resp" => Some(&self.resp),
            "obj" => Some(&self.obj),
            _ => None,
        }
    }

    pub fn namespace_mut(&mut self, ns: &str) -> Option<&mut HttpObject> {
        match ns {
            "req" => Some(&mut self.req),
            "bereq" => Some(&mut self.bereq),
            "beresp" => Some(&mut self.beresp),
            "resp" => Some(&mut self.resp),
            "obj" => Some(&mut self.obj),
            _ => None,
        }
    }

    pub fn restarts(&self) -> i64 {
        self.req.scalar("restarts").map(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_zero_restarts() {
        let ctx = Context::new();
        assert_eq!(ctx.restarts(), 0);
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let mut reg: Registry<i32> = Registry::new();
        reg.insert("b", 2);
        reg.insert("a", 1);
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn from_program_seeds_acls() {
        let program = Program::new().with_acl(AclDecl::new("t"));
        let ctx = Context::from_program(&program, EngineConfig::default());
        assert!(ctx.acls.contains("t"));
    }

    #[test]
    fn from_program_seeds_zero_valued_ratelimit_registries() {
        let mut program = Program::new();
        program.ratecounters.push("rc1".to_string());
        program.penaltyboxes.push("pb1".to_string());
        let ctx = Context::from_program(&program, EngineConfig::default());
        assert_eq!(ctx.ratecounters.get("rc1"), Some(&0));
        assert_eq!(ctx.penaltyboxes.get("pb1").map(|s| s.len()), Some(0));
    }
}
