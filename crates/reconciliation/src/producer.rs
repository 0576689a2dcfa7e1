//! Order lifecycle producer: persists orders and announces each change.

use chrono::Utc;
use common::OrderId;
use inventory::{Order, OrderLine, OrderStore};
use message_bus::EventPublisher;
use message_bus::envelope::TaggedEvent;

use crate::error::Result;
use crate::events::OrderEvent;

/// Order CRUD that publishes an [`OrderEvent`] after every committed change.
///
/// Events are published only once the write has succeeded. Publishing is
/// fire-and-forget: a lost event never fails the order operation.
#[derive(Clone)]
pub struct OrderService<S: OrderStore> {
    store: S,
    publisher: EventPublisher,
    topic: String,
}

impl<S: OrderStore> OrderService<S> {
    pub fn new(store: S, publisher: EventPublisher, topic: impl Into<String>) -> Self {
        Self {
            store,
            publisher,
            topic: topic.into(),
        }
    }

    /// Returns all orders with their lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Order>> {
        let mut orders = self.store.find_all().await?;
        for order in &mut orders {
            order.lines = self.store.find_lines(order.id).await?;
        }
        Ok(orders)
    }

    /// Returns an order with its lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: OrderId) -> Result<Order> {
        let mut order = self.store.find_by_id(id).await?;
        order.lines = self.store.find_lines(id).await?;
        Ok(order)
    }

    /// Persists an order and its lines, then publishes `OrderCreated`.
    #[tracing::instrument(skip(self, order), fields(customer = %order.customer, lines = order.lines.len()))]
    pub async fn create(&self, mut order: Order) -> Result<Order> {
        let lines = std::mem::take(&mut order.lines);
        let mut stored = self.store.insert_returning(order).await?;
        stored.lines = self.create_lines(stored.id, lines).await?;

        self.publish(OrderEvent::Created(stored.clone()))?;
        Ok(stored)
    }

    /// Updates an order, replaces its lines, then publishes `OrderUpdated`.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn update(&self, mut order: Order) -> Result<Order> {
        order.updated_at = Utc::now();
        let lines = std::mem::take(&mut order.lines);
        let mut stored = self.store.update_returning(order).await?;

        self.store.delete_lines(stored.id).await?;
        stored.lines = self.create_lines(stored.id, lines).await?;

        self.publish(OrderEvent::Updated(stored.clone()))?;
        Ok(stored)
    }

    /// Deletes an order and publishes `OrderDeleted` carrying its last
    /// snapshot, lines included, so consumers can undo its effects.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<()> {
        let snapshot = self.get_by_id(id).await?;
        self.store.delete(id).await?;

        self.publish(OrderEvent::Deleted(snapshot))
    }

    async fn create_lines(&self, order_id: OrderId, lines: Vec<OrderLine>) -> Result<Vec<OrderLine>> {
        let mut stored = Vec::with_capacity(lines.len());
        for line in lines {
            stored.push(self.store.create_line(order_id, line).await?);
        }
        Ok(stored)
    }

    fn publish(&self, event: OrderEvent) -> Result<()> {
        let message = event.to_message()?;
        tracing::info!(
            event = event.event_name(),
            order_id = %event.order().id,
            message_id = %message.uuid(),
            correlation_id = message.correlation_label(),
            topic = %self.topic,
            "publishing order event"
        );
        self.publisher.publish(&self.topic, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::{ProductId, WarehouseId};
    use inventory::{InMemoryStore, InventoryError};
    use message_bus::{Channel, Subscriber, Subscription};

    use super::*;
    use crate::error::ReconcileError;

    fn service() -> (OrderService<InMemoryStore>, InMemoryStore, Channel, Subscription) {
        let store = InMemoryStore::new();
        let channel = Channel::default();
        let subscription = channel.subscribe("orders").unwrap();
        let publisher = EventPublisher::new(Arc::new(channel.clone()));
        (
            OrderService::new(store.clone(), publisher, "orders"),
            store,
            channel,
            subscription,
        )
    }

    fn order() -> Order {
        Order::new(WarehouseId::new(1), "ada")
            .with_line(ProductId::new(1), 2, 150)
            .with_line(ProductId::new(2), 1, 300)
    }

    fn line_ids(order: &Order) -> Vec<common::OrderLineId> {
        order.lines.iter().map(|line| line.id).collect()
    }

    async fn next_event(subscription: &mut Subscription) -> OrderEvent {
        let message = subscription.next().await.unwrap();
        OrderEvent::from_message(&message).unwrap()
    }

    #[tokio::test]
    async fn create_persists_lines_then_publishes() {
        let (service, store, _channel, mut events) = service();

        let created = service.create(order()).await.unwrap();

        assert_eq!(created.lines.len(), 2);
        assert!(created.lines.iter().all(|line| line.order_id == created.id));
        assert_eq!(OrderStore::find_lines(&store, created.id).await.unwrap().len(), 2);
        match next_event(&mut events).await {
            OrderEvent::Created(published) => {
                assert_eq!(published.id, created.id);
                assert_eq!(line_ids(&published), line_ids(&created));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_replaces_lines_then_publishes() {
        let (service, store, _channel, mut events) = service();
        let created = service.create(order()).await.unwrap();
        next_event(&mut events).await;

        let mut changed = created.clone();
        changed.customer = "bo".to_string();
        changed.lines = vec![OrderLine::new(ProductId::new(3), 5, 10)];
        let updated = service.update(changed).await.unwrap();

        assert_eq!(updated.customer, "bo");
        assert!(updated.updated_at >= created.updated_at);
        let lines = OrderStore::find_lines(&store, created.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, ProductId::new(3));
        match next_event(&mut events).await {
            OrderEvent::Updated(published) => {
                assert_eq!(published.customer, "bo");
                assert_eq!(line_ids(&published), line_ids(&updated));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_publishes_the_full_snapshot() {
        let (service, _store, _channel, mut events) = service();
        let created = service.create(order()).await.unwrap();
        next_event(&mut events).await;

        service.delete(created.id).await.unwrap();

        match next_event(&mut events).await {
            OrderEvent::Deleted(snapshot) => {
                assert_eq!(snapshot.id, created.id);
                assert_eq!(snapshot.lines.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            service.get_by_id(created.id).await,
            Err(ReconcileError::Inventory(InventoryError::OrderNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn failed_write_publishes_nothing() {
        let (service, _store, channel, mut events) = service();
        let mut missing = order();
        missing.id = OrderId::new(404);

        let err = service.update(missing).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Inventory(InventoryError::OrderNotFound(_))
        ));

        channel.close();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn lost_events_do_not_fail_the_operation() {
        let (service, store, channel, _events) = service();
        channel.close();

        let created = service.create(order()).await.unwrap();

        assert_eq!(OrderStore::find_by_id(&store, created.id).await.unwrap().id, created.id);
    }
}
