//! Grouping of raw events by (namespace, resource, reason).

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kubeve_core::{Event, EventType, ResourceRef};

/// Summary of every event sharing one (namespace, resource, reason) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedGroup {
    pub namespace: String,
    pub resource: ResourceRef,
    pub reason: String,
    pub count: usize,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_type: EventType,
    pub last_message: String,
}

impl AggregatedGroup {
    fn start(event: &Event) -> Self {
        Self {
            namespace: event.namespace.clone(),
            resource: event.resource.clone(),
            reason: event.reason.clone(),
            count: 0,
            last_seen: event.timestamp,
            last_type: event.event_type,
            last_message: event.message.clone(),
        }
    }

    fn absorb(&mut self, event: &Event) {
        self.count += 1;
        // Equal timestamps: the later arrival wins. A missing timestamp sorts
        // below any real one.
        if event.timestamp >= self.last_seen {
            self.last_seen = event.timestamp;
            self.last_type = event.event_type;
            self.last_message = event.message.clone();
        }
    }
}

/// Reduces `events` to groups in display order.
#[must_use]
pub fn aggregate<'a, I>(events: I) -> Vec<AggregatedGroup>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut index: HashMap<(&str, &ResourceRef, &str), usize> = HashMap::new();
    let mut groups: Vec<AggregatedGroup> = Vec::new();
    for event in events {
        let key = (
            event.namespace.as_str(),
            &event.resource,
            event.reason.as_str(),
        );
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(AggregatedGroup::start(event));
            groups.len() - 1
        });
        groups[slot].absorb(event);
    }
    groups.sort_by(compare_groups);
    groups
}

/// Display order: count desc, last seen desc, then namespace, resource and
/// reason ascending. Distinct keys never compare equal.
#[must_use]
pub fn compare_groups(a: &AggregatedGroup, b: &AggregatedGroup) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| b.last_seen.cmp(&a.last_seen))
        .then_with(|| a.namespace.cmp(&b.namespace))
        .then_with(|| a.resource.cmp(&b.resource))
        .then_with(|| a.reason.cmp(&b.reason))
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use chrono::{TimeZone, Utc};
    use kubeve_core::{Event, EventType, ResourceRef};

    use super::{aggregate, compare_groups};

    fn event(ns: &str, kind: &str, name: &str, reason: &str, secs: Option<i64>) -> Event {
        Event {
            timestamp: secs.and_then(|s| Utc.timestamp_opt(1_714_564_800 + s, 0).single()),
            resource: ResourceRef::new(kind, name),
            event_type: EventType::Normal,
            reason: reason.into(),
            namespace: ns.into(),
            message: format!("{reason} at {secs:?}"),
        }
    }

    #[test]
    fn same_key_collapses_to_latest() {
        let t1 = event("default", "Pod", "a", "Created", Some(1));
        let t2 = event("default", "Pod", "a", "Created", Some(2));
        let groups = aggregate(&[t1, t2.clone()]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].last_seen, t2.timestamp);
        assert_eq!(groups[0].last_message, t2.message);
    }

    #[test]
    fn out_of_order_arrival_keeps_greatest_timestamp() {
        let newer = event("default", "Pod", "a", "Created", Some(9));
        let older = event("default", "Pod", "a", "Created", Some(3));
        let groups = aggregate(&[newer.clone(), older]);
        assert_eq!(groups[0].last_seen, newer.timestamp);
        assert_eq!(groups[0].last_message, newer.message);
    }

    #[test]
    fn timestamp_tie_goes_to_last_arrival() {
        let mut first = event("default", "Pod", "a", "BackOff", Some(5));
        first.message = "first".into();
        let mut second = first.clone();
        second.message = "second".into();
        second.event_type = EventType::Warning;
        let groups = aggregate(&[first, second]);
        assert_eq!(groups[0].last_message, "second");
        assert_eq!(groups[0].last_type, EventType::Warning);
    }

    #[test]
    fn missing_timestamps_lose_to_real_ones() {
        let timed = event("default", "Pod", "a", "Pulled", Some(1));
        let untimed = event("default", "Pod", "a", "Pulled", None);
        let groups = aggregate(&[timed.clone(), untimed]);
        assert_eq!(groups[0].last_seen, timed.timestamp);
    }

    #[test]
    fn order_is_count_then_recency_then_keys() {
        let events = vec![
            event("b", "Pod", "x", "Pulled", Some(1)),
            event("a", "Pod", "x", "Pulled", Some(1)),
            event("a", "Pod", "y", "Killing", Some(7)),
            event("a", "Pod", "z", "Started", Some(2)),
            event("a", "Pod", "z", "Started", Some(3)),
        ];
        let groups = aggregate(&events);
        let keys: Vec<String> = groups
            .iter()
            .map(|g| format!("{}/{}/{}", g.namespace, g.resource, g.reason))
            .collect();
        assert_eq!(
            keys,
            vec![
                "a/Pod/z/Started",
                "a/Pod/y/Killing",
                "a/Pod/x/Pulled",
                "b/Pod/x/Pulled",
            ]
        );
    }

    #[test]
    fn counts_sum_to_event_total() {
        let reasons = ["Created", "Started", "BackOff"];
        let namespaces = ["default", "kube-system"];
        let mut events = Vec::new();
        for i in 0..97_i64 {
            let ns = namespaces[(i % 2) as usize];
            let reason = reasons[(i % 3) as usize];
            let name = format!("web-{}", i % 5);
            let ts = if i % 11 == 0 { None } else { Some(i % 13) };
            events.push(event(ns, "Pod", &name, reason, ts));
        }
        let groups = aggregate(&events);
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), events.len());
    }

    #[test]
    fn order_is_strict_and_total() {
        let mut events = Vec::new();
        for i in 0..40_i64 {
            events.push(event(
                ["a", "b", ""][(i % 3) as usize],
                ["Pod", "Node"][(i % 2) as usize],
                &format!("n{}", i % 4),
                ["Created", "Killing"][(i % 2) as usize],
                if i % 7 == 0 { None } else { Some(i % 5) },
            ));
        }
        let groups = aggregate(&events);
        for (i, a) in groups.iter().enumerate() {
            for (j, b) in groups.iter().enumerate() {
                let ord = compare_groups(a, b);
                if i == j {
                    assert_eq!(ord, Ordering::Equal);
                } else {
                    assert_ne!(ord, Ordering::Equal);
                    assert_eq!(ord, compare_groups(b, a).reverse());
                    assert_eq!(ord, i.cmp(&j));
                }
            }
        }
    }
}
