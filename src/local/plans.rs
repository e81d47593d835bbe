use time::OffsetDateTime;

use super::{read_json, read_records, write_json, LocalStorage, CURRENT_PLAN_KEY, PLANS_KEY};
use crate::plans::model::{new_plan_id, WeeklyPlan};

pub const MAX_SAVED_PLANS: usize = 50;

/// Saved plans, newest first.
pub fn list(store: &dyn LocalStorage) -> Vec<WeeklyPlan> {
    read_records(store, PLANS_KEY)
}

/// Stores the plan at the front of the list, replacing any entry with the
/// same id, and returns the id (assigned when missing).
pub fn save(store: &dyn LocalStorage, mut plan: WeeklyPlan) -> String {
    let id = plan.id.clone().unwrap_or_else(new_plan_id);
    plan.id = Some(id.clone());

    let mut plans: Vec<WeeklyPlan> = list(store)
        .into_iter()
        .filter(|p| p.id.as_deref() != Some(id.as_str()))
        .collect();
    plans.insert(0, plan);
    plans.truncate(MAX_SAVED_PLANS);
    write_json(store, PLANS_KEY, &plans);
    id
}

pub fn delete(store: &dyn LocalStorage, id: &str) -> bool {
    let plans = list(store);
    let before = plans.len();
    let kept: Vec<WeeklyPlan> = plans
        .into_iter()
        .filter(|p| p.id.as_deref() != Some(id))
        .collect();
    let removed = kept.len() != before;
    write_json(store, PLANS_KEY, &kept);
    removed
}

pub fn current(store: &dyn LocalStorage) -> Option<WeeklyPlan> {
    read_json(store, CURRENT_PLAN_KEY)
}

/// The working plan, or a fresh empty one for this week (which is stored).
pub fn current_or_new(store: &dyn LocalStorage, now: OffsetDateTime) -> WeeklyPlan {
    if let Some(plan) = current(store) {
        return plan;
    }
    let plan = WeeklyPlan::new_for(now);
    set_current(store, &plan);
    plan
}

pub fn set_current(store: &dyn LocalStorage, plan: &WeeklyPlan) {
    write_json(store, CURRENT_PLAN_KEY, plan);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryStorage;
    use time::macros::datetime;

    fn plan(id: Option<&str>) -> WeeklyPlan {
        let mut p = WeeklyPlan::new_for(datetime!(2024-05-15 10:00 UTC));
        p.id = id.map(String::from);
        p
    }

    #[test]
    fn save_assigns_id_and_replaces_same_id() {
        let store = MemoryStorage::default();
        let id = save(&store, plan(None));
        assert!(!id.is_empty());
        save(&store, plan(Some("b")));

        let mut renamed = plan(Some(&id));
        renamed.name = Some("Renamed".into());
        save(&store, renamed);

        let plans = list(&store);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].name.as_deref(), Some("Renamed"));
        assert_eq!(plans[1].id.as_deref(), Some("b"));
    }

    #[test]
    fn list_is_capped() {
        let store = MemoryStorage::default();
        for i in 0..(MAX_SAVED_PLANS + 5) {
            save(&store, plan(Some(&i.to_string())));
        }
        let plans = list(&store);
        assert_eq!(plans.len(), MAX_SAVED_PLANS);
        assert_eq!(plans[0].id.as_deref(), Some("54"));
    }

    #[test]
    fn delete_and_current_plan() {
        let store = MemoryStorage::default();
        save(&store, plan(Some("a")));
        assert!(delete(&store, "a"));
        assert!(!delete(&store, "a"));

        assert!(current(&store).is_none());
        let fresh = current_or_new(&store, datetime!(2024-05-15 10:00 UTC));
        assert_eq!(fresh.week_start, datetime!(2024-05-13 0:00 UTC));
        assert_eq!(current(&store), Some(fresh));
    }
}
