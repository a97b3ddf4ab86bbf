use log::warn;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Access categories a system parameter can register an identifier under.
///
/// `Any` is the aggregate every other category also writes into; it backs
/// sigil-less query tokens and is never emitted by the classifier directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Any,
    Direct,
    Query,
    MutQuery,
    EventRead,
    EventWrite,
    Res,
    MutRes,
    With,
    Without,
}

impl Category {
    /// Every concrete category the classifier can emit into.
    pub const ALL: [Category; 9] = [
        Category::Direct,
        Category::Query,
        Category::MutQuery,
        Category::EventRead,
        Category::EventWrite,
        Category::Res,
        Category::MutRes,
        Category::With,
        Category::Without,
    ];

    pub fn from_sigil(c: char) -> Option<Category> {
        match c {
            '&' => Some(Category::Query),
            '*' => Some(Category::MutQuery),
            '<' => Some(Category::EventRead),
            '>' => Some(Category::EventWrite),
            '#' => Some(Category::Res),
            '$' => Some(Category::MutRes),
            '+' => Some(Category::With),
            '-' => Some(Category::Without),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Any => "any",
            Category::Direct => "direct",
            Category::Query => "query",
            Category::MutQuery => "mut_query",
            Category::EventRead => "event_read",
            Category::EventWrite => "event_write",
            Category::Res => "res",
            Category::MutRes => "mut_res",
            Category::With => "with",
            Category::Without => "without",
        }
    }
}

/// Display directive returned alongside query results: `Short` is a one-line
/// reference per system, `Long` renders the full declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Short,
    Long,
}

/// Where a system was declared, convertible back to the source slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryStats {
    pub category: &'static str,
    pub identifiers: usize,
    pub entries: usize,
}

/// Static description of the query language, exposed for help output.
pub const QUERY_HELP: &str = "\
Query syntax: space-separated tokens, each narrowing the result set.
  &X   systems with an immutable component reference to X
  *X   systems with a mutable component reference to X
  #X   systems reading resource X
  $X   systems mutating resource X (ResMut / NonSendMut)
  <X   systems with an event reader for X
  >X   systems with an event writer for X
  +X   systems whose queries filter With<X>
  -X   systems whose queries filter Without<X>
  X    systems referencing X under any category
Patterns are case-sensitive substrings of registered identifiers.
Prefix the whole query with ':' to render full declarations (long mode).";

/// Inverted index over (category, identifier) facts emitted by the
/// classifier, keyed back to system names.
#[derive(Debug, Default)]
pub struct SystemIndex {
    by_category: HashMap<Category, HashMap<String, HashSet<String>>>,
    any: HashMap<String, HashSet<String>>,
    /// system name -> every identifier it references; drives removal.
    systems: HashMap<String, HashSet<String>>,
    /// Insertion order of `systems` keys; the base candidate set of a query.
    order: Vec<String>,
    locs: HashMap<String, Location>,
    initialized: bool,
    generation: u64,
}

impl SystemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system's declaration location. Returns `false` and leaves
    /// the index untouched when the name is already taken: the first
    /// declaration wins and the collision is surfaced as a diagnostic.
    pub fn record_declaration(&mut self, system: &str, location: Location) -> bool {
        if let Some(existing) = self.locs.get(system) {
            warn!(
                "Duplicate system name {system} at {}:{} (first declared at {}:{}), skipping",
                location.file.display(),
                location.start_line,
                existing.file.display(),
                existing.start_line,
            );
            return false;
        }
        self.locs.insert(system.to_string(), location);
        true
    }

    /// Records one (category, identifier) fact for a system. The fact is
    /// also visible through the `any` aggregate and the per-system
    /// bookkeeping map.
    pub fn insert(&mut self, system: &str, category: Category, ident: &str) {
        if category != Category::Any {
            self.by_category
                .entry(category)
                .or_default()
                .entry(ident.to_string())
                .or_default()
                .insert(system.to_string());
        }
        self.any
            .entry(ident.to_string())
            .or_default()
            .insert(system.to_string());
        if !self.systems.contains_key(system) {
            self.order.push(system.to_string());
        }
        self.systems
            .entry(system.to_string())
            .or_default()
            .insert(ident.to_string());
    }

    /// Removes a system from every per-identifier set it appears in, then
    /// from the bookkeeping maps. Unknown names are a no-op. Cost is
    /// proportional to the system's identifier count, not to index size.
    pub fn remove_system(&mut self, system: &str) {
        self.locs.remove(system);
        let Some(idents) = self.systems.remove(system) else {
            return;
        };

        for ident in &idents {
            for category in Category::ALL {
                if let Some(map) = self.by_category.get_mut(&category)
                    && let Some(set) = map.get_mut(ident)
                {
                    set.remove(system);
                    if set.is_empty() {
                        map.remove(ident);
                    }
                }
            }
            if let Some(set) = self.any.get_mut(ident) {
                set.remove(system);
                if set.is_empty() {
                    self.any.remove(ident);
                }
            }
        }

        self.order.retain(|name| name != system);
    }

    /// Removes every system through the removal path.
    pub fn clear(&mut self) {
        let mut names: HashSet<String> = self.systems.keys().cloned().collect();
        names.extend(self.locs.keys().cloned());
        for name in names {
            self.remove_system(&name);
        }
    }

    /// Evaluates a query string: an optional leading `:` selects long mode,
    /// then each space-separated token narrows the candidate set to systems
    /// registered under an identifier containing the token's pattern in the
    /// token's sigil-selected category. An empty intersection short-circuits
    /// to `([], Short)` regardless of the requested mode.
    pub fn query(&self, text: &str) -> (Vec<String>, QueryMode) {
        let (mode, text) = match text.strip_prefix(':') {
            Some(rest) => (QueryMode::Long, rest.trim()),
            None => (QueryMode::Short, text),
        };

        let mut candidates: HashSet<&str> = self.systems.keys().map(String::as_str).collect();

        for token in text.split(' ') {
            let (category, pattern) = parse_token(token);
            let map = self.category_map(category);

            let mut matched: HashSet<&str> = HashSet::new();
            for (ident, systems) in map {
                if ident.contains(pattern) {
                    matched.extend(systems.iter().map(String::as_str));
                }
            }

            candidates.retain(|system| matched.contains(system));
            if candidates.is_empty() {
                return (Vec::new(), QueryMode::Short);
            }
        }

        let names = self
            .order
            .iter()
            .filter(|name| candidates.contains(name.as_str()))
            .cloned()
            .collect();
        (names, mode)
    }

    pub fn location(&self, system: &str) -> Option<&Location> {
        self.locs.get(system)
    }

    /// Every declared system with its location, ordered by file then line.
    pub fn declared_systems(&self) -> Vec<(&str, &Location)> {
        let mut systems: Vec<(&str, &Location)> = self
            .locs
            .iter()
            .map(|(name, loc)| (name.as_str(), loc))
            .collect();
        systems.sort_by(|(a_name, a), (b_name, b)| {
            (&a.file, a.start_line, *a_name).cmp(&(&b.file, b.start_line, *b_name))
        });
        systems
    }

    pub fn declared_count(&self) -> usize {
        self.locs.len()
    }

    pub fn category_stats(&self) -> Vec<CategoryStats> {
        let mut stats = Vec::with_capacity(Category::ALL.len() + 1);
        stats.push(CategoryStats {
            category: Category::Any.name(),
            identifiers: self.any.len(),
            entries: self.any.values().map(HashSet::len).sum(),
        });
        for category in Category::ALL {
            let map = self.category_map(category);
            stats.push(CategoryStats {
                category: category.name(),
                identifiers: map.len(),
                entries: map.values().map(HashSet::len).sum(),
            });
        }
        stats
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Bumped at the start of every rebuild; lets callers detect that
    /// results from a previous pass are stale.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn category_map(&self, category: Category) -> &HashMap<String, HashSet<String>> {
        match category {
            Category::Any => &self.any,
            _ => match self.by_category.get(&category) {
                Some(map) => map,
                None => empty_map(),
            },
        }
    }
}

fn empty_map() -> &'static HashMap<String, HashSet<String>> {
    static EMPTY: OnceLock<HashMap<String, HashSet<String>>> = OnceLock::new();
    EMPTY.get_or_init(HashMap::new)
}

fn parse_token(token: &str) -> (Category, &str) {
    let mut chars = token.chars();
    match chars.next().and_then(Category::from_sigil) {
        Some(category) => (category, chars.as_str()),
        None => (Category::Any, token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &str, line: usize) -> Location {
        Location {
            file: PathBuf::from(file),
            start_byte: 0,
            end_byte: 0,
            start_line: line,
            end_line: line,
        }
    }

    #[test]
    fn sigil_selects_category() {
        let mut index = SystemIndex::new();
        index.insert("move_ships", Category::Query, "Transform");
        index.insert("move_ships", Category::MutQuery, "Velocity");

        assert_eq!(index.query("&Transform").0, vec!["move_ships"]);
        assert_eq!(index.query("*Velocity").0, vec!["move_ships"]);
        assert!(index.query("*Transform").0.is_empty());
        assert!(index.query("&Velocity").0.is_empty());
    }

    #[test]
    fn sigil_less_token_matches_any_category() {
        let mut index = SystemIndex::new();
        index.insert("spawn_ui", Category::Res, "ImageAssets");

        assert_eq!(index.query("ImageAssets").0, vec!["spawn_ui"]);
        assert_eq!(index.query("#ImageAssets").0, vec!["spawn_ui"]);
        assert!(index.query("$ImageAssets").0.is_empty());
    }

    #[test]
    fn patterns_match_as_substrings() {
        let mut index = SystemIndex::new();
        index.insert("render_hp", Category::Direct, "FooBar");

        assert_eq!(index.query("Foo").0, vec!["render_hp"]);
        assert_eq!(index.query("ooBa").0, vec!["render_hp"]);
        assert!(index.query("foo").0.is_empty(), "match is case-sensitive");
    }

    #[test]
    fn lone_sigil_matches_every_key_in_its_category() {
        let mut index = SystemIndex::new();
        index.insert("a", Category::With, "Player");
        index.insert("b", Category::With, "Ship");
        index.insert("c", Category::Without, "Player");

        let (mut names, _) = index.query("+");
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn tokens_intersect_independent_of_order() {
        let mut index = SystemIndex::new();
        index.insert("a", Category::Query, "Transform");
        index.insert("a", Category::With, "Player");
        index.insert("b", Category::Query, "Transform");

        assert_eq!(index.query("&Transform +Player").0, vec!["a"]);
        assert_eq!(index.query("+Player &Transform").0, vec!["a"]);

        let (mut both, _) = index.query("&Transform");
        both.sort();
        assert_eq!(both, vec!["a", "b"]);
    }

    #[test]
    fn leading_colon_selects_long_mode() {
        let mut index = SystemIndex::new();
        index.insert("a", Category::Query, "Transform");

        assert_eq!(index.query("&Transform").1, QueryMode::Short);
        assert_eq!(index.query(":&Transform").1, QueryMode::Long);
        assert_eq!(index.query(": &Transform").0, vec!["a"]);
    }

    #[test]
    fn failed_query_is_always_short_mode() {
        let mut index = SystemIndex::new();
        index.insert("a", Category::Query, "Transform");

        let (names, mode) = index.query(":&Missing");
        assert!(names.is_empty());
        assert_eq!(mode, QueryMode::Short);
    }

    #[test]
    fn results_preserve_insertion_order() {
        let mut index = SystemIndex::new();
        index.insert("later", Category::Direct, "Shared");
        index.insert("earlier", Category::Direct, "Shared");
        index.insert("last", Category::Direct, "Shared");

        assert_eq!(index.query("Shared").0, vec!["later", "earlier", "last"]);
    }

    #[test]
    fn remove_system_leaves_other_registrations_intact() {
        let mut index = SystemIndex::new();
        index.record_declaration("a", loc("a.rs", 1));
        index.insert("a", Category::Query, "Transform");
        index.insert("a", Category::With, "Player");
        index.insert("b", Category::Query, "Transform");

        index.remove_system("a");

        assert!(index.query("+Player").0.is_empty());
        assert_eq!(index.query("&Transform").0, vec!["b"]);
        assert_eq!(index.query("Transform").0, vec!["b"]);
        assert!(index.location("a").is_none());
    }

    #[test]
    fn remove_unknown_system_is_a_noop() {
        let mut index = SystemIndex::new();
        index.insert("a", Category::Query, "Transform");
        index.remove_system("missing");
        assert_eq!(index.query("&Transform").0, vec!["a"]);
    }

    #[test]
    fn clear_empties_every_map() {
        let mut index = SystemIndex::new();
        index.record_declaration("a", loc("a.rs", 1));
        index.insert("a", Category::Query, "Transform");
        index.insert("b", Category::Res, "Config");

        index.clear();

        assert_eq!(index.query("Transform"), (Vec::new(), QueryMode::Short));
        assert_eq!(index.query(""), (Vec::new(), QueryMode::Short));
        assert_eq!(index.declared_count(), 0);
        for stats in index.category_stats() {
            assert_eq!(stats.entries, 0, "category {} not empty", stats.category);
        }
    }

    #[test]
    fn duplicate_declaration_is_rejected_first_wins() {
        let mut index = SystemIndex::new();
        assert!(index.record_declaration("a", loc("first.rs", 1)));
        assert!(!index.record_declaration("a", loc("second.rs", 9)));
        assert_eq!(index.location("a").unwrap().file, PathBuf::from("first.rs"));
    }

    #[test]
    fn queries_on_an_empty_index_return_nothing() {
        let index = SystemIndex::new();
        assert!(!index.is_initialized());
        assert_eq!(index.query("anything"), (Vec::new(), QueryMode::Short));
    }
}
