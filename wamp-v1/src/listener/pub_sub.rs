use futures_util::future::join_all;
use log::{
    debug,
    info,
    warn,
};

use crate::{
    core::{
        id::SessionId,
        types::Value,
        uri::Uri,
    },
    listener::{
        listener::Listener,
        topic::{
            PublishOptions,
            event_receivers,
        },
    },
    message::message::{
        EventMessage,
        Message,
    },
};

impl Listener {
    /// Creates a topic.
    ///
    /// Topics can only be created explicitly when the listener uses fixed topics, unless `force` is
    /// set. Returns `true` if the topic was created.
    pub async fn create_topic(&self, topic: Uri, force: bool) -> bool {
        if !self.config.fixed_topics && !force {
            warn!("Refusing to create topic {topic}: topics are not fixed");
            return false;
        }
        if let Err(err) = self.observer.topic_creating(&topic).await {
            debug!("Creation of topic {topic} canceled: {err:#}");
            return false;
        }
        if !self.topics.create(topic.clone()).await {
            return false;
        }
        info!("Created topic {topic}");
        self.observer.topic_created(&topic).await;
        true
    }

    /// Removes a topic along with all of its subscriptions.
    ///
    /// Like [`Self::create_topic`], requires fixed topics or `force`. Returns `true` if the topic
    /// was removed.
    pub async fn remove_topic(&self, topic: &Uri, force: bool) -> bool {
        if !self.config.fixed_topics && !force {
            warn!("Refusing to remove topic {topic}: topics are not fixed");
            return false;
        }
        let subscribers = match self.topics.remove(topic).await {
            Some(subscribers) => subscribers,
            None => return false,
        };
        for subscriber in subscribers {
            if let Some(session) = self.sessions.get(&subscriber) {
                session.forget_subscription(topic).await;
            }
        }
        info!("Removed topic {topic}");
        self.observer.topic_removed(topic).await;
        true
    }

    /// Subscribes a session to a topic.
    ///
    /// Without fixed topics, a missing topic is created. Returns `true` if the session was newly
    /// subscribed.
    pub async fn subscribe(&self, topic: Uri, session: &SessionId) -> bool {
        let create = !self.config.fixed_topics;
        if !create && !self.topics.contains(&topic).await {
            debug!("Session {session} cannot subscribe to missing topic {topic}");
            return false;
        }
        if create && !self.topics.contains(&topic).await {
            if let Err(err) = self.observer.topic_creating(&topic).await {
                debug!("Creation of topic {topic} canceled: {err:#}");
                return false;
            }
        }
        if let Err(err) = self.observer.subscribing(&topic, session).await {
            debug!("Subscription of session {session} to topic {topic} canceled: {err:#}");
            return false;
        }
        let outcome = match self
            .topics
            .subscribe(topic.clone(), session.clone(), create)
            .await
        {
            Some(outcome) => outcome,
            None => return false,
        };
        if let Some(live) = self.sessions.get(session) {
            live.record_subscription(topic.clone()).await;
        }
        // Recorded subscriptions are pruned on disconnect, so the session must still be registered
        // after recording.
        if self.sessions.get(session).is_none() {
            debug!("Session {session} closed while subscribing to topic {topic}");
            self.topics
                .unsubscribe(&topic, session, !self.config.fixed_topics)
                .await;
            return false;
        }
        if outcome.created {
            info!("Created topic {topic}");
            self.observer.topic_created(&topic).await;
        }
        if outcome.added {
            debug!("Session {session} subscribed to topic {topic}");
            self.observer.subscribed(&topic, session).await;
        }
        outcome.added
    }

    /// Unsubscribes a session from a topic.
    ///
    /// Without fixed topics, the topic is removed when its last subscriber leaves. Returns `true`
    /// if the session was subscribed.
    pub async fn unsubscribe(&self, topic: &Uri, session: &SessionId) -> bool {
        if let Some(live) = self.sessions.get(session) {
            live.forget_subscription(topic).await;
        }
        self.remove_subscriber(topic, session).await
    }

    pub(crate) async fn remove_subscriber(&self, topic: &Uri, session: &SessionId) -> bool {
        let outcome = self
            .topics
            .unsubscribe(topic, session, !self.config.fixed_topics)
            .await;
        if outcome.removed {
            debug!("Session {session} unsubscribed from topic {topic}");
            self.observer.unsubscribed(topic, session).await;
        }
        if outcome.destroyed {
            info!("Removed topic {topic}");
            self.observer.topic_removed(topic).await;
        }
        outcome.removed
    }

    /// Publishes an event to a topic's subscribers.
    ///
    /// `publisher` is the publishing session, if any; events published by the listener itself have
    /// none. Receivers that cannot be reached are skipped. Returns the sessions the event was
    /// delivered to.
    pub async fn publish(
        &self,
        topic: &Uri,
        publisher: Option<&SessionId>,
        event: Value,
        options: &PublishOptions,
    ) -> Vec<SessionId> {
        let subscribers = match self.topics.subscribers(topic).await {
            Some(subscribers) => subscribers,
            None => {
                debug!("Dropping event for missing topic {topic}");
                return Vec::default();
            }
        };
        let mut receivers = event_receivers(&subscribers, publisher, options);
        if let Err(err) = self
            .observer
            .publishing(topic, publisher, &mut receivers)
            .await
        {
            debug!("Publication to topic {topic} canceled: {err:#}");
            return Vec::default();
        }

        let message = Message::Event(EventMessage {
            topic: topic.to_string(),
            event,
        });
        let text = match self.serializer.serialize_message(&message) {
            Ok(text) => text,
            Err(err) => {
                warn!("Failed to serialize event for topic {topic}: {err:#}");
                return Vec::default();
            }
        };

        let sessions = receivers
            .iter()
            .filter_map(|receiver| self.sessions.get(receiver))
            .collect::<Vec<_>>();
        let results = join_all(sessions.iter().map(|session| {
            let text = text.clone();
            async move { (session, session.send_message(text).await) }
        }))
        .await;

        let mut delivered = Vec::with_capacity(results.len());
        for (session, result) in results {
            match result {
                Ok(()) => delivered.push(session.id().clone()),
                Err(err) => warn!(
                    "Failed to deliver event for topic {topic} to session {}: {err:#}",
                    session.id()
                ),
            }
        }
        self.observer
            .published(topic, publisher, &delivered)
            .await;
        delivered
    }

    /// All topics.
    pub async fn topics(&self) -> Vec<Uri> {
        self.topics.topics().await
    }

    /// The subscribers of a topic, sorted, or [`None`] if the topic does not exist.
    pub async fn subscribers(&self, topic: &Uri) -> Option<Vec<SessionId>> {
        let mut subscribers = self
            .topics
            .subscribers(topic)
            .await?
            .into_iter()
            .collect::<Vec<_>>();
        subscribers.sort();
        Some(subscribers)
    }
}

