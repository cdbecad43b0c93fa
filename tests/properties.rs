use proptest::prelude::*;
use repodigest::engine::TokenAnalyzer;
use repodigest::engine::tokens::AnalyzeOptions;
use repodigest::engine::tools::normalize_rel;
use repodigest::format::{render_template, validate_template};
use repodigest::pipeline::{
    BudgetLedger, TruncationSettings, enforce_budget, priority_score, sort_by_priority,
};
use repodigest::{Candidate, NodeKind, ScanNode};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;

fn candidate(rel: &str) -> Candidate {
    Candidate {
        absolute_path: PathBuf::from("/w").join(rel),
        relative_path: rel.to_string(),
        source_node: ScanNode {
            path: PathBuf::from("/w").join(rel),
            rel_path: rel.to_string(),
            kind: NodeKind::File,
            is_symlink: false,
        },
    }
}

fn rel_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}(\\.(rs|md|json|ts|toml|test\\.ts))?", 1..4)
        .prop_map(|parts| parts.join("/"))
}

proptest! {
    #[test]
    fn budget_is_never_exceeded(
        sizes in prop::collection::vec(0usize..3000, 1..12),
        max_tokens in 1usize..600,
    ) {
        let ledger = Mutex::new(BudgetLedger::new(max_tokens));
        let analyzer = TokenAnalyzer::default();
        let settings = TruncationSettings::default();
        let mut total = 0;
        for (i, size) in sizes.iter().enumerate() {
            let content: String = "abcdefghi\n".chars().cycle().take(*size).collect();
            let analysis = analyzer
                .analyze(&content, &AnalyzeOptions { budget: None, skip_cache: true })
                .unwrap();
            let decision = enforce_budget(
                &ledger,
                &format!("f{i}.txt"),
                &content,
                &analysis,
                &analyzer,
                &settings,
                None,
            )
            .unwrap();
            total += decision.tokens;
        }
        prop_assert!(total <= max_tokens);
        prop_assert_eq!(ledger.lock().unwrap().used(), total);
    }

    #[test]
    fn render_template_is_total(template in ".{0,64}") {
        let bag = json!({"a": {"b": [1, "two", null]}, "s": "x"});
        let _ = render_template(&template, &bag);
    }

    #[test]
    fn valid_templates_render_without_braces(keys in prop::collection::vec("[a-z]{1,5}(\\.[a-z0-9]{1,3}){0,2}", 0..4)) {
        let template: String = keys.iter().map(|k| format!("<{{{{{k}}}}}>")).collect();
        prop_assert!(validate_template(&template).is_ok());
        let out = render_template(&template, &json!({}));
        prop_assert_eq!(out, "<>".repeat(keys.len()));
    }

    #[test]
    fn priority_order_ignores_input_order(
        paths in prop::collection::btree_set(rel_path(), 1..16)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>())
            .prop_shuffle(),
    ) {
        let mut shuffled: Vec<Candidate> = paths.iter().map(|p| candidate(p)).collect();
        let mut sorted_input = paths.clone();
        sorted_input.sort();
        let mut from_sorted: Vec<Candidate> = sorted_input.iter().map(|p| candidate(p)).collect();

        sort_by_priority(&mut shuffled);
        sort_by_priority(&mut from_sorted);

        let a: Vec<&str> = shuffled.iter().map(|c| c.relative_path.as_str()).collect();
        let b: Vec<&str> = from_sorted.iter().map(|c| c.relative_path.as_str()).collect();
        prop_assert_eq!(&a, &b);
        for w in a.windows(2) {
            let (s0, s1) = (priority_score(w[0]), priority_score(w[1]));
            prop_assert!(s0 > s1 || (s0 == s1 && w[0] < w[1]));
        }
    }

    #[test]
    fn normalize_rel_is_idempotent(path in "[a-z./\\\\]{0,16}") {
        let once = normalize_rel(&path);
        prop_assert_eq!(normalize_rel(&once), once.clone());
        prop_assert!(!once.ends_with('/'));
        prop_assert!(!once.starts_with("./"));
    }
}
