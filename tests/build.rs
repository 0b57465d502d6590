use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use xylem::build::{Builder, IndexEntry};
use xylem::config::Config;
use xylem::post::State;
use xylem::router::Router;

const MAIN: &str = r#"<html><body><nav><a href="{{.routes.home}}">home</a></nav>{{template "content" .}}</body></html>"#;

const INDEX: &str = r#"<ol>{{range .posts}}<li data-timestamp="{{.timestamp}}"><a href="{{.url}}">{{.title}}</a> {{.date}}</li>{{end}}</ol>"#;

const ROUTER: &str = "routes:\n  home: /\n";

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn post(title: &str, date: Option<&str>) -> String {
    let mut s = format!("<?xyl-meta name=\"title\" value=\"{}\"?>\n", title);
    if let Some(date) = date {
        s.push_str(&format!("<?xyl-meta name=\"date\" value=\"{}\"?>\n", date));
    }
    s.push_str("<article><h1>{{.title}}</h1></article>\n");
    s
}

// Lays out a project in a temporary directory with the given posts, keyed by
// their path relative to the content root.
fn site(posts: &[(&str, String)]) -> (TempDir, Config, Router) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("xylem.yaml"), "default_layout: Main\n");
    write(&root.join("In/Layouts/Main.xyl"), MAIN);
    write(&root.join("In/Index.xyl"), INDEX);
    write(&root.join("In/Router.yaml"), ROUTER);
    for (name, contents) in posts {
        write(&root.join("In/Posts").join(name), contents);
    }

    let config = Config::from_directory(root, None).unwrap();
    let router = Router::load(&config.router).unwrap();
    (dir, config, router)
}

fn mtime(path: &Path) -> i64 {
    DateTime::<Utc>::from(fs::metadata(path).unwrap().modified().unwrap()).timestamp()
}

#[test]
fn test_posts_are_built_in_descending_path_order() {
    let (_dir, config, router) = site(&[
        ("a.xyl", post("A", None)),
        ("b.xyl", post("B", None)),
        ("c.xyl", post("C", None)),
    ]);
    let mut builder = Builder::new(&config, &router);
    builder.build().unwrap();

    let titles: Vec<&str> = builder.posts().iter().map(|p| p.title()).collect();
    assert_eq!(titles, vec!["C", "B", "A"]);
}

#[test]
fn test_output_tree_mirrors_content_tree() {
    let (_dir, config, router) = site(&[
        ("top.xyl", post("Top", None)),
        ("2024/01/deep.xyl", post("Deep", None)),
        ("notes/ignored.txt", String::from("not a post")),
    ]);
    Builder::new(&config, &router).build().unwrap();

    let out = &config.output_directory;
    assert!(out.join("top.html").is_file());
    assert!(out.join("2024/01/deep.html").is_file());
    assert!(out.join("index.html").is_file());
    assert!(!out.join("notes/ignored.html").exists());
}

#[test]
fn test_directives_are_stripped_from_output() {
    let (_dir, config, router) = site(&[("hello.xyl", post("Hello", None))]);
    let mut builder = Builder::new(&config, &router);
    builder.build().unwrap();

    assert_eq!(builder.posts()[0].title(), "Hello");
    let output = fs::read_to_string(config.output_directory.join("hello.html")).unwrap();
    assert!(output.contains("<h1>Hello</h1>"));
    assert!(output.contains(r#"<a href="/">home</a>"#));
    assert!(!output.contains("xyl-meta"));
}

#[test]
fn test_layout_resolution() {
    let (dir, config, router) = site(&[
        ("plain.xyl", post("Plain", None)),
        (
            "special.xyl",
            String::from(
                "<?xyl-meta name=\"title\" value=\"Special\"?>\n\
                 <?xyl-meta name=\"layout\" value=\"Special\"?>\n\
                 <p>special</p>\n",
            ),
        ),
    ]);
    write(
        &dir.path().join("In/Layouts/Special.xyl"),
        r#"<main class="special">{{template "content" .}}</main>"#,
    );
    let mut builder = Builder::new(&config, &router);
    builder.build().unwrap();

    let layouts: Vec<&str> = builder.posts().iter().map(|p| p.layout_name()).collect();
    assert_eq!(layouts, vec!["Special", "Main"]);
    let special = fs::read_to_string(config.output_directory.join("special.html")).unwrap();
    assert!(special.starts_with(r#"<main class="special">"#));
    let plain = fs::read_to_string(config.output_directory.join("plain.html")).unwrap();
    assert!(plain.starts_with("<html>"));
}

#[test]
fn test_index_lists_posts_in_build_order() {
    let (dir, config, router) = site(&[
        ("2024-02-01.xyl", post("B", None)),
        ("2024-01-01.xyl", post("A", Some("2024-01-15T00:00:00Z"))),
    ]);
    let undated = mtime(&dir.path().join("In/Posts/2024-02-01.xyl"));
    let mut builder = Builder::new(&config, &router);
    builder.build().unwrap();

    let entries = builder.index_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "B");
    assert_eq!(entries[0].url, "2024-02-01.html");
    assert_eq!(entries[0].timestamp, undated);
    assert_eq!(
        entries[0].date,
        Utc.timestamp_opt(undated, 0)
            .unwrap()
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    );
    assert_eq!(
        entries[1],
        IndexEntry {
            title: String::from("A"),
            url: String::from("2024-01-01.html"),
            timestamp: 1705276800,
            date: String::from("2024-01-15T00:00:00+00:00"),
        }
    );

    let index = fs::read_to_string(config.index_path()).unwrap();
    let b = index.find(r#"<a href="2024-02-01.html">B</a>"#).unwrap();
    let a = index
        .find(r#"<li data-timestamp="1705276800"><a href="2024-01-01.html">A</a> 2024-01-15T00:00:00+00:00</li>"#)
        .unwrap();
    assert!(b < a);
}

#[test]
fn test_titles_are_escaped_in_output() {
    let (_dir, config, router) = site(&[(
        "xss.xyl",
        post("a &lt;script&gt;x&lt;/script&gt; &amp; b", None),
    )]);
    let mut builder = Builder::new(&config, &router);
    builder.build().unwrap();

    assert_eq!(builder.posts()[0].title(), "a <script>x</script> & b");
    let escaped = "a &lt;script&gt;x&lt;/script&gt; &amp; b";
    let page = fs::read_to_string(config.output_directory.join("xss.html")).unwrap();
    assert!(page.contains(&format!("<h1>{}</h1>", escaped)));
    assert!(!page.contains("<script>"));
    let index = fs::read_to_string(config.index_path()).unwrap();
    assert!(index.contains(&format!(r#"<a href="xss.html">{}</a>"#, escaped)));
    assert!(!index.contains("<script>"));
}

#[test]
fn test_post_is_kept_when_its_render_fails() {
    let (_dir, config, router) = site(&[("blocked.xyl", post("Blocked", None))]);
    let mut builder = Builder::new(&config, &router);
    builder.reset().unwrap();
    // a directory where the page should go makes the write fail
    let destination = config.output_directory.join("blocked.html");
    fs::create_dir_all(&destination).unwrap();

    assert!(builder.build_posts().is_err());
    assert_eq!(builder.posts().len(), 1);
    let post = &builder.posts()[0];
    assert_eq!(post.title(), "Blocked");
    match post.state() {
        State::Pending { destination: d, .. } => assert_eq!(d, &destination),
        state => panic!("unexpected state: {:?}", state),
    }
}

#[test]
fn test_build_discards_previous_output() {
    let (_dir, config, router) = site(&[("hello.xyl", post("Hello", None))]);
    write(&config.output_directory.join("stale/old.html"), "old");
    Builder::new(&config, &router).build().unwrap();

    assert!(!config.output_directory.join("stale").exists());
    assert!(config.output_directory.join("hello.html").is_file());
}

#[test]
fn test_reset_without_output_directory() {
    let (_dir, config, router) = site(&[]);
    assert!(!config.output_directory.exists());
    let builder = Builder::new(&config, &router);
    builder.reset().unwrap();
    builder.reset().unwrap();
    assert!(config.output_directory.is_dir());
    assert_eq!(fs::read_dir(&config.output_directory).unwrap().count(), 0);
}

#[test]
fn test_failures_abort_the_build() {
    let (_dir, config, router) = site(&[
        ("b.xyl", post("Fine", None)),
        ("a.xyl", post("Broken", Some("yesterday"))),
    ]);
    let mut builder = Builder::new(&config, &router);
    let err = builder.build().unwrap_err();
    assert!(err.to_string().contains("yesterday"));

    // b.xyl was rendered before a.xyl failed; the index never was
    assert!(config.output_directory.join("b.html").is_file());
    assert!(!config.index_path().exists());
}
