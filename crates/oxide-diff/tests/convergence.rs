//! Generated-snapshot tests for self-diff emptiness and apply convergence.

use proptest::prelude::*;

use oxide_diff::prelude::*;

const MOOD: &str = "\"public\".\"mood\"";
const MOOD_ARRAY: &str = "\"public\".\"mood\"[]";

/// Knobs for one generated snapshot.
type Shape = (
    Vec<&'static str>,
    Option<&'static str>,
    Option<(&'static str, bool)>,
    usize,
    Option<&'static str>,
    bool,
    bool,
);

/// Generates a small schema around one enum, one table, stacked views, a
/// function with a dependent view and an index.
fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    (
        prop::sample::subsequence(vec!["a", "b", "c"], 1..=3).prop_shuffle(),
        prop::option::of(prop::sample::select(vec![
            "text",
            "character varying(10)",
            "character varying(20)",
        ])),
        prop::option::of((prop::sample::select(vec![MOOD, MOOD_ARRAY]), any::<bool>())),
        0..=2usize,
        prop::option::of(prop::sample::select(vec!["integer", "bigint"])),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(build)
}

fn build((labels, note, mood, views, returns, function_view, index): Shape) -> Snapshot {
    let table_id = ObjectId::table("public", "t");
    let mut table = Table::new("public", "t").column(Column::new("id", "integer").not_null());
    if let Some(data_type) = note {
        table = table.column(Column::new("note", data_type));
    }
    if let Some((data_type, with_default)) = mood {
        let mut column = Column::new("mood", data_type);
        if with_default && data_type == MOOD {
            column = column.default(format!("'{}'::{MOOD}", labels[0]));
        }
        table = table
            .column(column)
            .depends_on(ObjectId::enum_type("public", "mood"));
    }

    let mut snapshot = Snapshot::new()
        .with(EnumType::new("public", "mood", labels))
        .with(table);

    if views >= 1 {
        snapshot = snapshot.with(View::new("public", "v", "select * from t").depends_on(table_id));
    }
    if views >= 2 {
        snapshot = snapshot.with(
            View::new("public", "w", "select * from v").depends_on(ObjectId::view("public", "v")),
        );
    }
    if let Some(returns) = returns {
        snapshot = snapshot.with(Function::new("public", "f", returns, "sql", "select 1"));
        if function_view {
            snapshot = snapshot.with(
                View::new("public", "fv", "select \"public\".\"f\"()")
                    .depends_on(ObjectId::function("public", "f", "")),
            );
        }
    }
    if index {
        snapshot = snapshot.with(Index::new("public", "t", "t_id_idx", ["id"]));
    }
    snapshot
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn self_diff_is_always_empty(snapshot in arb_snapshot()) {
        let mut m = Migration::from_snapshots(snapshot.clone(), snapshot, DiffOptions::new()).unwrap();
        m.add_all_changes(true).unwrap();
        prop_assert!(m.changes().unwrap().is_empty());
        prop_assert_eq!(m.sql().unwrap(), "");
    }

    #[test]
    fn apply_always_converges(from in arb_snapshot(), to in arb_snapshot()) {
        let mut m = Migration::from_snapshots(from, to, DiffOptions::new()).unwrap();
        m.add_all_changes(true).unwrap();
        prop_assert!(m.diagnostics().unwrap().is_empty());

        m.set_safety(false);
        m.sql().unwrap();
        m.apply().unwrap();

        m.add_all_changes(true).unwrap();
        prop_assert!(m.changes().unwrap().is_empty());
        prop_assert_eq!(m.source().unwrap(), m.target().unwrap());
    }
}
