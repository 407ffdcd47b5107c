use tokio::sync::RwLock;

use crate::{
    core::{
        hash::{
            HashMap,
            HashSet,
        },
        id::SessionId,
        uri::Uri,
    },
    message::message::PublishRecipients,
};

/// Selects which subscribers of a topic receive a published event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// If non-empty, only these sessions receive the event, and the other options are ignored.
    pub eligibles: Vec<SessionId>,
    /// Sessions that do not receive the event.
    pub excludes: Vec<SessionId>,
    /// Whether the publisher itself does not receive the event.
    pub exclude_me: bool,
}

impl From<PublishRecipients> for PublishOptions {
    fn from(value: PublishRecipients) -> Self {
        match value {
            PublishRecipients::All => Self::default(),
            PublishRecipients::ExcludeMe => Self {
                exclude_me: true,
                ..Default::default()
            },
            PublishRecipients::Targeted {
                excludes,
                eligibles,
            } => Self {
                eligibles,
                excludes,
                exclude_me: false,
            },
        }
    }
}

/// Computes the receivers of an event out of a topic's subscribers.
pub fn event_receivers(
    subscribers: &HashSet<SessionId>,
    publisher: Option<&SessionId>,
    options: &PublishOptions,
) -> Vec<SessionId> {
    if !options.eligibles.is_empty() {
        let eligibles = options.eligibles.iter().collect::<HashSet<_>>();
        return subscribers
            .iter()
            .filter(|session| eligibles.contains(session))
            .cloned()
            .collect();
    }
    let excludes = options.excludes.iter().collect::<HashSet<_>>();
    subscribers
        .iter()
        .filter(|session| !excludes.contains(session))
        .filter(|session| !options.exclude_me || publisher != Some(*session))
        .cloned()
        .collect()
}

/// The result of adding a subscriber to a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOutcome {
    /// The topic did not exist and was created.
    pub created: bool,
    /// The session was not already subscribed.
    pub added: bool,
}

/// The result of removing a subscriber from a topic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeOutcome {
    /// The session was subscribed.
    pub removed: bool,
    /// The topic became empty and was removed.
    pub destroyed: bool,
}

/// The registry of topics and their subscribers.
///
/// Every operation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct TopicManager {
    topics: RwLock<HashMap<Uri, HashSet<SessionId>>>,
}

impl TopicManager {
    /// Checks if a topic exists.
    pub async fn contains(&self, topic: &Uri) -> bool {
        self.topics.read().await.contains_key(topic)
    }

    /// Creates an empty topic, unless it already exists.
    pub async fn create(&self, topic: Uri) -> bool {
        let mut topics = self.topics.write().await;
        if topics.contains_key(&topic) {
            return false;
        }
        topics.insert(topic, HashSet::default());
        true
    }

    /// Removes a topic, returning its subscribers.
    pub async fn remove(&self, topic: &Uri) -> Option<HashSet<SessionId>> {
        self.topics.write().await.remove(topic)
    }

    /// Adds a subscriber to a topic.
    ///
    /// A missing topic is created if `create` is set. Otherwise, nothing happens and [`None`] is
    /// returned.
    pub async fn subscribe(
        &self,
        topic: Uri,
        session: SessionId,
        create: bool,
    ) -> Option<SubscribeOutcome> {
        let mut topics = self.topics.write().await;
        let created = !topics.contains_key(&topic);
        if created && !create {
            return None;
        }
        let added = topics.entry(topic).or_default().insert(session);
        Some(SubscribeOutcome { created, added })
    }

    /// Removes a subscriber from a topic.
    ///
    /// The topic is removed if it becomes empty and `destroy_if_empty` is set.
    pub async fn unsubscribe(
        &self,
        topic: &Uri,
        session: &SessionId,
        destroy_if_empty: bool,
    ) -> UnsubscribeOutcome {
        let mut topics = self.topics.write().await;
        let subscribers = match topics.get_mut(topic) {
            Some(subscribers) => subscribers,
            None => return UnsubscribeOutcome::default(),
        };
        let removed = subscribers.remove(session);
        let destroyed = removed && destroy_if_empty && subscribers.is_empty();
        if destroyed {
            topics.remove(topic);
        }
        UnsubscribeOutcome { removed, destroyed }
    }

    /// A snapshot of a topic's subscribers.
    pub async fn subscribers(&self, topic: &Uri) -> Option<HashSet<SessionId>> {
        self.topics.read().await.get(topic).cloned()
    }

    /// All topics.
    pub async fn topics(&self) -> Vec<Uri> {
        self.topics.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod topic_test {
    use crate::{
        core::{
            hash::HashSet,
            id::SessionId,
            uri::Uri,
        },
        listener::topic::{
            PublishOptions,
            SubscribeOutcome,
            TopicManager,
            UnsubscribeOutcome,
            event_receivers,
        },
        message::message::PublishRecipients,
    };

    fn ids(ids: &[&str]) -> HashSet<SessionId> {
        ids.iter().map(|id| SessionId::from(*id)).collect()
    }

    fn vec_ids(ids: &[&str]) -> Vec<SessionId> {
        ids.iter().map(|id| SessionId::from(*id)).collect()
    }

    #[test]
    fn eligibles_take_precedence() {
        let receivers = event_receivers(
            &ids(&["A", "B", "C"]),
            Some(&SessionId::from("A")),
            &PublishOptions {
                eligibles: vec_ids(&["A", "C", "D"]),
                excludes: vec_ids(&["A", "C"]),
                exclude_me: true,
            },
        );
        pretty_assertions::assert_eq!(HashSet::from_iter(receivers), ids(&["A", "C"]));
    }

    #[test]
    fn excludes_and_exclude_me_combine() {
        let receivers = event_receivers(
            &ids(&["A", "B", "C"]),
            Some(&SessionId::from("A")),
            &PublishOptions {
                eligibles: Vec::new(),
                excludes: vec_ids(&["B"]),
                exclude_me: true,
            },
        );
        pretty_assertions::assert_eq!(receivers, vec_ids(&["C"]));
    }

    #[test]
    fn publishes_to_all_subscribers_by_default() {
        let receivers = event_receivers(
            &ids(&["A", "B", "C"]),
            Some(&SessionId::from("A")),
            &PublishOptions::default(),
        );
        pretty_assertions::assert_eq!(HashSet::from_iter(receivers), ids(&["A", "B", "C"]));
    }

    #[test]
    fn exclude_me_without_publisher_excludes_nobody() {
        let receivers = event_receivers(
            &ids(&["A", "B"]),
            None,
            &PublishOptions::from(PublishRecipients::ExcludeMe),
        );
        pretty_assertions::assert_eq!(HashSet::from_iter(receivers), ids(&["A", "B"]));
    }

    #[test]
    fn converts_recipients_to_options() {
        pretty_assertions::assert_eq!(
            PublishOptions::from(PublishRecipients::Targeted {
                excludes: vec_ids(&["B"]),
                eligibles: vec_ids(&["C"]),
            }),
            PublishOptions {
                eligibles: vec_ids(&["C"]),
                excludes: vec_ids(&["B"]),
                exclude_me: false,
            }
        );
    }

    #[tokio::test]
    async fn subscribe_creates_topic_only_when_allowed() {
        let topics = TopicManager::default();
        let topic = Uri::try_from("http://example.com/event").unwrap();
        assert_matches::assert_matches!(
            topics.subscribe(topic.clone(), SessionId::from("A"), false).await,
            None
        );
        assert!(!topics.contains(&topic).await);
        assert_matches::assert_matches!(
            topics.subscribe(topic.clone(), SessionId::from("A"), true).await,
            Some(SubscribeOutcome {
                created: true,
                added: true,
            })
        );
        assert_matches::assert_matches!(
            topics.subscribe(topic.clone(), SessionId::from("A"), false).await,
            Some(SubscribeOutcome {
                created: false,
                added: false,
            })
        );
        pretty_assertions::assert_eq!(topics.subscribers(&topic).await, Some(ids(&["A"])));
    }

    #[tokio::test]
    async fn unsubscribe_destroys_empty_topic_when_allowed() {
        let topics = TopicManager::default();
        let topic = Uri::try_from("http://example.com/event").unwrap();
        topics.subscribe(topic.clone(), SessionId::from("A"), true).await;
        topics.subscribe(topic.clone(), SessionId::from("B"), true).await;

        pretty_assertions::assert_eq!(
            topics.unsubscribe(&topic, &SessionId::from("A"), true).await,
            UnsubscribeOutcome {
                removed: true,
                destroyed: false,
            }
        );
        pretty_assertions::assert_eq!(
            topics.unsubscribe(&topic, &SessionId::from("A"), true).await,
            UnsubscribeOutcome::default()
        );
        pretty_assertions::assert_eq!(
            topics.unsubscribe(&topic, &SessionId::from("B"), true).await,
            UnsubscribeOutcome {
                removed: true,
                destroyed: true,
            }
        );
        assert!(topics.topics().await.is_empty());
    }

    #[tokio::test]
    async fn fixed_topic_survives_last_unsubscribe() {
        let topics = TopicManager::default();
        let topic = Uri::try_from("http://example.com/event").unwrap();
        assert!(topics.create(topic.clone()).await);
        assert!(!topics.create(topic.clone()).await);
        topics.subscribe(topic.clone(), SessionId::from("A"), false).await;
        pretty_assertions::assert_eq!(
            topics.unsubscribe(&topic, &SessionId::from("A"), false).await,
            UnsubscribeOutcome {
                removed: true,
                destroyed: false,
            }
        );
        pretty_assertions::assert_eq!(topics.subscribers(&topic).await, Some(ids(&[])));
        assert_matches::assert_matches!(topics.remove(&topic).await, Some(_));
        assert!(!topics.contains(&topic).await);
    }
}
