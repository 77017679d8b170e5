// src/app/grouping.rs
// Filtering and grouping of the model list for the models view. Pure functions over a snapshot of the store.

use crate::app::model::Model;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A toggleable filter chip on the models view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelFilter {
    /// Only show models whose file is on disk.
    Downloaded,
    /// Group by category instead of the current/ready/recommended layout.
    Grouped,
    /// Only show models added from the Hugging Face hub.
    Hf,
}

impl ModelFilter {
    pub fn all() -> [ModelFilter; 3] {
        [Self::Downloaded, Self::Grouped, Self::Hf]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Downloaded => "Downloaded",
            Self::Grouped => "Grouped",
            Self::Hf => "Hugging Face",
        }
    }
}

/// Set of active filters. Absent means inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeSet<ModelFilter>);

impl FilterSet {
    pub fn new(filters: impl IntoIterator<Item = ModelFilter>) -> Self {
        Self(filters.into_iter().collect())
    }

    pub fn contains(&self, filter: ModelFilter) -> bool {
        self.0.contains(&filter)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flips a filter, returning whether it is now active.
    pub fn toggle(&mut self, filter: ModelFilter) -> bool {
        if !self.0.remove(&filter) {
            self.0.insert(filter);
            true
        } else {
            false
        }
    }

    /// Whether a model passes every active filter predicate.
    pub fn admits(&self, model: &Model) -> bool {
        (!self.contains(ModelFilter::Downloaded) || model.is_downloaded)
            && (!self.contains(ModelFilter::Hf) || model.is_hf())
    }
}

/// Identifies a display group. The fixed keys belong to the ungrouped layout,
/// `Local`, `Unknown` and `Category` to the grouped one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    CurrentModel,
    ReadyToUse,
    Recommended,
    Local,
    Unknown,
    Category(String),
}

impl GroupKey {
    pub fn display_name(&self) -> &str {
        match self {
            Self::CurrentModel => "Currently Used Model",
            Self::ReadyToUse => "Available to Use",
            Self::Recommended => "Recommended Downloads",
            Self::Local => "Local Models",
            Self::Unknown => "Unknown",
            Self::Category(label) => label,
        }
    }

    /// The current-model group always stays open.
    pub fn is_collapsible(&self) -> bool {
        !matches!(self, Self::CurrentModel)
    }

    /// Stable key used to persist the expanded state.
    pub fn storage_key(&self) -> String {
        match self {
            Self::CurrentModel => "CURRENT_MODEL".to_string(),
            Self::ReadyToUse => "READY_TO_USE".to_string(),
            Self::Recommended => "RECOMMENDED".to_string(),
            Self::Local => "LOCAL".to_string(),
            Self::Unknown => "UNKNOWN".to_string(),
            Self::Category(label) => format!("category:{}", label),
        }
    }
}

/// A named, ordered bucket of models for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup<'a> {
    pub key: GroupKey,
    pub models: Vec<&'a Model>,
}

/// Category used in grouped mode: local imports first, then the model type.
pub fn default_category(model: &Model) -> GroupKey {
    if model.is_local_file() {
        GroupKey::Local
    } else if model.model_type.is_empty() {
        GroupKey::Unknown
    } else {
        GroupKey::Category(model.model_type.clone())
    }
}

/// Stable partition: downloaded models first, input order kept on both sides.
pub fn sort_downloaded_first<'a>(models: Vec<&'a Model>) -> Vec<&'a Model> {
    let (mut downloaded, rest): (Vec<&Model>, Vec<&Model>) =
        models.into_iter().partition(|m| m.is_downloaded);
    downloaded.extend(rest);
    downloaded
}

/// The active model if it is in the list, otherwise the default model if it is.
pub fn find_current_model<'a>(
    models: &'a [Model],
    active_model_id: Option<&str>,
    default_model_id: &str,
) -> Option<&'a Model> {
    active_model_id
        .and_then(|id| models.iter().find(|m| m.id == id))
        .or_else(|| models.iter().find(|m| m.id == default_model_id))
}

/// Computes the groups shown on the models view.
///
/// Ids are expected to be unique; duplicates show up as duplicate rows.
/// Empty groups are never returned.
pub fn compute_display_groups<'a, F>(
    models: &'a [Model],
    filters: &FilterSet,
    active_model_id: Option<&str>,
    default_model_id: &str,
    category_of: F,
) -> Vec<ModelGroup<'a>>
where
    F: Fn(&Model) -> GroupKey,
{
    let filtered: Vec<&Model> = models.iter().filter(|m| filters.admits(m)).collect();

    let groups = if filters.contains(ModelFilter::Grouped) {
        group_by_category(filtered, category_of)
    } else {
        let ordered = sort_downloaded_first(filtered);
        let current = find_current_model(models, active_model_id, default_model_id);
        let is_current = |m: &Model| current.is_some_and(|c| c.id == m.id);

        let (ready, recommended): (Vec<&Model>, Vec<&Model>) = ordered
            .into_iter()
            .filter(|m| !is_current(m))
            .partition(|m| m.is_downloaded);

        vec![
            ModelGroup {
                key: GroupKey::CurrentModel,
                models: current.into_iter().collect(),
            },
            ModelGroup {
                key: GroupKey::ReadyToUse,
                models: ready,
            },
            ModelGroup {
                key: GroupKey::Recommended,
                models: recommended,
            },
        ]
    };

    groups.into_iter().filter(|g| !g.models.is_empty()).collect()
}

fn group_by_category<'a, F>(models: Vec<&'a Model>, category_of: F) -> Vec<ModelGroup<'a>>
where
    F: Fn(&Model) -> GroupKey,
{
    let mut groups: Vec<ModelGroup<'a>> = Vec::new();
    for model in models {
        let key = category_of(model);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.models.push(model),
            None => groups.push(ModelGroup {
                key,
                models: vec![model],
            }),
        }
    }
    groups
}

/// Which groups the user has expanded. Unknown groups start expanded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandedGroups(BTreeMap<String, bool>);

impl ExpandedGroups {
    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        if !key.is_collapsible() {
            return true;
        }
        self.0.get(&key.storage_key()).copied().unwrap_or(true)
    }

    /// Flips a group. Returns false when the group cannot collapse.
    pub fn toggle(&mut self, key: &GroupKey) -> bool {
        if !key.is_collapsible() {
            return false;
        }
        let expanded = self.is_expanded(key);
        self.0.insert(key.storage_key(), !expanded);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::model::{Model, ModelOrigin, DEFAULT_MODEL_ID};

    fn model(id: &str, downloaded: bool, origin: ModelOrigin, model_type: &str) -> Model {
        let mut m = Model::local(id, 1);
        m.is_downloaded = downloaded;
        m.origin = origin;
        m.is_local = origin == ModelOrigin::Local;
        m.model_type = model_type.to_string();
        m
    }

    fn ids(group: &ModelGroup<'_>) -> Vec<String> {
        group.models.iter().map(|m| m.id.clone()).collect()
    }

    fn keys(groups: &[ModelGroup<'_>]) -> Vec<GroupKey> {
        groups.iter().map(|g| g.key.clone()).collect()
    }

    fn catalog() -> Vec<Model> {
        vec![
            model("a", true, ModelOrigin::Preset, "Chat"),
            model("b", false, ModelOrigin::Hf, "Chat"),
            model("c", true, ModelOrigin::Hf, "Reasoning"),
            model("d", false, ModelOrigin::Preset, ""),
            model("e", true, ModelOrigin::Local, "Chat"),
        ]
    }

    #[test]
    fn downloaded_first_keeps_relative_order() {
        let models = vec![
            model("A", true, ModelOrigin::Preset, ""),
            model("B", false, ModelOrigin::Preset, ""),
            model("C", true, ModelOrigin::Preset, ""),
        ];
        let sorted = sort_downloaded_first(models.iter().collect());
        let order: Vec<&str> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn ungrouped_layout_has_current_ready_and_recommended() {
        let models = catalog();
        let groups =
            compute_display_groups(&models, &FilterSet::default(), Some("c"), DEFAULT_MODEL_ID, default_category);

        assert_eq!(
            keys(&groups),
            vec![GroupKey::CurrentModel, GroupKey::ReadyToUse, GroupKey::Recommended]
        );
        assert_eq!(ids(&groups[0]), vec!["c"]);
        assert_eq!(ids(&groups[1]), vec!["a", "e"]);
        assert_eq!(ids(&groups[2]), vec!["b", "d"]);
    }

    #[test]
    fn no_model_appears_in_two_groups() {
        let models = catalog();
        for active in [None, Some("a"), Some("b"), Some("missing")] {
            let groups =
                compute_display_groups(&models, &FilterSet::default(), active, "d", default_category);
            let mut seen: Vec<String> = groups.iter().flat_map(ids).collect();
            let total = seen.len();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), total, "active = {:?}", active);
            assert_eq!(total, models.len());
        }
    }

    #[test]
    fn current_model_falls_back_to_default_then_empty() {
        let models = catalog();
        let groups = compute_display_groups(&models, &FilterSet::default(), None, "d", default_category);
        assert_eq!(groups[0].key, GroupKey::CurrentModel);
        assert_eq!(ids(&groups[0]), vec!["d"]);
        // The default is not recommended twice.
        assert!(groups.iter().skip(1).all(|g| !ids(g).contains(&"d".to_string())));

        let groups =
            compute_display_groups(&models, &FilterSet::default(), Some("gone"), "also-gone", default_category);
        assert_eq!(keys(&groups), vec![GroupKey::ReadyToUse, GroupKey::Recommended]);
    }

    #[test]
    fn active_model_wins_over_default() {
        let models = catalog();
        let groups = compute_display_groups(&models, &FilterSet::default(), Some("e"), "a", default_category);
        assert_eq!(ids(&groups[0]), vec!["e"]);
        assert_eq!(ids(&groups[1]), vec!["a", "c"]);
    }

    #[test]
    fn downloaded_and_hf_filters_compose() {
        let models = catalog();
        let filters = FilterSet::new([ModelFilter::Downloaded, ModelFilter::Hf]);
        let groups = compute_display_groups(&models, &filters, None, "none", default_category);
        assert_eq!(keys(&groups), vec![GroupKey::ReadyToUse]);
        assert_eq!(ids(&groups[0]), vec!["c"]);

        let reversed = FilterSet::new([ModelFilter::Hf, ModelFilter::Downloaded]);
        assert_eq!(
            groups,
            compute_display_groups(&models, &reversed, None, "none", default_category)
        );
    }

    #[test]
    fn downloaded_filter_is_idempotent() {
        let models = catalog();
        let filters = FilterSet::new([ModelFilter::Downloaded]);
        let once: Vec<Model> = models.iter().filter(|m| filters.admits(m)).cloned().collect();
        let twice: Vec<Model> = once.iter().filter(|m| filters.admits(m)).cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn grouped_mode_uses_categories_in_first_appearance_order() {
        let models = catalog();
        let filters = FilterSet::new([ModelFilter::Grouped]);
        let groups = compute_display_groups(&models, &filters, Some("a"), DEFAULT_MODEL_ID, default_category);

        assert_eq!(
            keys(&groups),
            vec![
                GroupKey::Category("Chat".to_string()),
                GroupKey::Category("Reasoning".to_string()),
                GroupKey::Unknown,
                GroupKey::Local,
            ]
        );
        // Grouped mode keeps the input order, no downloaded-first sort.
        assert_eq!(ids(&groups[0]), vec!["a", "b"]);
        assert_eq!(ids(&groups[3]), vec!["e"]);
    }

    #[test]
    fn local_origin_beats_model_type() {
        let mut m = model("x", true, ModelOrigin::Local, "Chat");
        m.is_local = false;
        assert_eq!(default_category(&m), GroupKey::Local);

        let mut flagged = model("y", true, ModelOrigin::Hf, "Chat");
        flagged.is_local = true;
        assert_eq!(default_category(&flagged), GroupKey::Local);
    }

    #[test]
    fn only_an_empty_type_is_unknown() {
        let empty = model("x", false, ModelOrigin::Preset, "");
        assert_eq!(default_category(&empty), GroupKey::Unknown);
        let blank = model("y", false, ModelOrigin::Preset, " ");
        assert_eq!(default_category(&blank), GroupKey::Category(" ".to_string()));
    }

    #[test]
    fn grouping_is_deterministic() {
        let models = catalog();
        for filters in [
            FilterSet::default(),
            FilterSet::new([ModelFilter::Grouped]),
            FilterSet::new([ModelFilter::Downloaded, ModelFilter::Grouped]),
        ] {
            let first = compute_display_groups(&models, &filters, Some("b"), "a", default_category);
            let second = compute_display_groups(&models, &filters, Some("b"), "a", default_category);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn empty_list_yields_no_groups() {
        let groups = compute_display_groups(&[], &FilterSet::default(), None, DEFAULT_MODEL_ID, default_category);
        assert!(groups.is_empty());
    }

    #[test]
    fn current_model_group_cannot_collapse() {
        let mut expanded = ExpandedGroups::default();
        assert!(!expanded.toggle(&GroupKey::CurrentModel));
        assert!(expanded.is_expanded(&GroupKey::CurrentModel));

        let chat = GroupKey::Category("Chat".to_string());
        assert!(expanded.is_expanded(&chat));
        assert!(expanded.toggle(&chat));
        assert!(!expanded.is_expanded(&chat));
        assert!(expanded.toggle(&chat));
        assert!(expanded.is_expanded(&chat));
    }

    #[test]
    fn filter_toggle_reports_new_state() {
        let mut filters = FilterSet::default();
        assert!(filters.toggle(ModelFilter::Hf));
        assert!(filters.contains(ModelFilter::Hf));
        assert!(!filters.toggle(ModelFilter::Hf));
        assert!(filters.is_empty());
    }
}
