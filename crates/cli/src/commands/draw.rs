use serde::Serialize;
use serde_json::json;
use teamdraw_core::draw::random::from_seed_or_entropy;
use teamdraw_core::{partition, sample, Capacity, DrawCount, GroupLabel, Pool};

use crate::commands::CommandResult;

#[derive(Clone, Debug, Default)]
pub struct TeamsArgs {
    pub size: i64,
    pub seed: Option<u64>,
    pub items: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PickArgs {
    pub count: i64,
    pub seed: Option<u64>,
    pub excluded: Vec<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GroupOutput {
    label: String,
    remainder: bool,
    members: Vec<String>,
}

pub fn teams(args: TeamsArgs) -> CommandResult {
    let capacity = match Capacity::from_requested(args.size) {
        Ok(capacity) => capacity,
        Err(error) => return CommandResult::failure("teams", "invalid_size", error.to_string(), 2),
    };

    let pool = Pool::from_labels(args.items);
    let candidates = pool.len();
    let groups = partition(pool, capacity, &mut from_seed_or_entropy(args.seed));
    let groups: Vec<GroupOutput> = groups
        .into_iter()
        .map(|group| GroupOutput {
            label: group.label().to_string(),
            remainder: group.label() == GroupLabel::Remainder,
            members: group.into_members(),
        })
        .collect();

    let message = format!("split {candidates} candidate(s) into {} group(s)", groups.len());
    CommandResult::success_with_data("teams", message, Some(json!({ "groups": groups })))
}

pub fn pick(args: PickArgs) -> CommandResult {
    let count = match DrawCount::new(args.count) {
        Ok(count) => count,
        Err(error) => return CommandResult::failure("pick", "invalid_count", error.to_string(), 2),
    };

    let excluded: Vec<String> =
        args.excluded.iter().map(|item| item.trim().to_owned()).collect();
    let pool = Pool::excluding(Pool::from_labels(args.items).into_vec(), &excluded);
    let candidates = pool.len();
    let picked = sample(pool, count, &mut from_seed_or_entropy(args.seed));

    let message = format!("picked {} of {candidates} candidate(s)", picked.len());
    CommandResult::success_with_data("pick", message, Some(json!({ "picked": picked })))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{pick, teams, PickArgs, TeamsArgs};

    fn items(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn payload(output: &str) -> Value {
        serde_json::from_str(output).expect("command output should be valid JSON")
    }

    #[test]
    fn teams_reports_full_groups_then_remainder() {
        let result = teams(TeamsArgs {
            size: 2,
            seed: Some(1),
            items: items(&["a", "b", "c", "d", "e"]),
        });
        assert_eq!(result.exit_code, 0);

        let payload = payload(&result.output);
        let groups = payload["data"]["groups"].as_array().expect("groups");
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0]["label"], "Team 1");
        assert_eq!(groups[2]["label"], "Leftover members");
        assert_eq!(groups[2]["remainder"], true);
        assert_eq!(groups[2]["members"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn teams_with_non_positive_size_keeps_one_group() {
        let result = teams(TeamsArgs { size: -1, seed: Some(1), items: items(&["a", "b", "c"]) });
        let payload = payload(&result.output);
        let groups = payload["data"]["groups"].as_array().expect("groups");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0]["remainder"], false);
    }

    #[test]
    fn pick_excludes_and_caps_at_pool_size() {
        let result = pick(PickArgs {
            count: 5,
            seed: Some(3),
            excluded: items(&["b"]),
            items: items(&["a", "b", "c", " "]),
        });
        assert_eq!(result.exit_code, 0);

        let payload = payload(&result.output);
        let mut picked: Vec<&str> = payload["data"]["picked"]
            .as_array()
            .expect("picked")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        picked.sort_unstable();
        assert_eq!(picked, vec!["a", "c"]);
    }

    #[test]
    fn pick_rejects_count_below_one() {
        let result = pick(PickArgs { count: 0, seed: None, excluded: Vec::new(), items: items(&["a"]) });
        assert_eq!(result.exit_code, 2);

        let payload = payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_count");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = || {
            pick(PickArgs {
                count: 3,
                seed: Some(42),
                excluded: Vec::new(),
                items: items(&["a", "b", "c", "d", "e", "f"]),
            })
            .output
        };
        assert_eq!(run(), run());
    }
}
