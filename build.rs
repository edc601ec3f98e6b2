use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source trees covered by the policy checks. The reference pack under `examples/`
/// and the build output under `target/` are never scanned.
const SCANNED_ROOTS: [&str; 4] = ["estimator", "cli", "tests", "benches"];

/// One source policy: a line pattern and the explanation printed when it matches.
struct Policy {
    name: &'static str,
    pattern: &'static str,
    advice: &'static str,
    comments_only: bool,
}

const POLICIES: [Policy; 3] = [
    Policy {
        name: "underscore-prefixed bindings",
        pattern: r"(?:\blet\s+(?:mut\s+)?|[(,|]\s*)_[A-Za-z]\w*\s*[:=,)|]",
        advice: "Either use the binding (removing the underscore) or remove it completely.",
        comments_only: false,
    },
    Policy {
        name: "#[allow(dead_code)] attributes",
        pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        advice: "Remove the unused item instead of silencing the lint.",
        comments_only: false,
    },
    Policy {
        name: "edit-history comments",
        pattern: r"//.*\b(FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFY|UPDATED|UPDATE)\b",
        advice: "Comments describe the code as it is, not how it came to be.",
        comments_only: true,
    },
];

/// Collects every matching line of one file.
struct PolicyCollector<'a> {
    policy: &'a Policy,
    violations: Vec<String>,
}

impl Sink for PolicyCollector<'_> {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = String::from_utf8_lossy(mat.bytes());
        let line_text = line_text.trim_end();
        let is_comment = line_text.trim_start().starts_with("//");
        if self.policy.comments_only || !is_comment {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn rust_sources() -> Vec<PathBuf> {
    SCANNED_ROOTS
        .iter()
        .flat_map(|root| WalkDir::new(root).into_iter().filter_map(Result::ok))
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|entry| entry.into_path())
        .collect()
}

fn check_file(
    policy: &Policy,
    matcher: &RegexMatcher,
    path: &Path,
) -> Result<Option<String>, Box<dyn Error>> {
    let mut collector = PolicyCollector {
        policy,
        violations: Vec::new(),
    };
    Searcher::new().search_path(matcher, path, &mut collector)?;
    if collector.violations.is_empty() {
        return Ok(None);
    }

    let mut message = format!(
        "\n❌ ERROR: Found {} {} in {}:\n",
        collector.violations.len(),
        policy.name,
        path.display()
    );
    for violation in &collector.violations {
        message.push_str(&format!("   {violation}\n"));
    }
    message.push_str(&format!("   {}\n", policy.advice));
    Ok(Some(message))
}

fn scan_sources() -> Result<(), Box<dyn Error>> {
    let sources = rust_sources();
    let mut report = String::new();
    for policy in &POLICIES {
        let matcher = RegexMatcher::new_line_matcher(policy.pattern)?;
        for path in &sources {
            if let Some(message) = check_file(policy, &matcher, path)? {
                report.push_str(&message);
            }
        }
    }
    if report.is_empty() {
        Ok(())
    } else {
        Err(report.into())
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for root in SCANNED_ROOTS {
        println!("cargo:rerun-if-changed={root}");
    }

    if let Err(e) = scan_sources() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
