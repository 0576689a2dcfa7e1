//! Stock reconciliation: applies order events to article stock.

use async_trait::async_trait;
use inventory::{ArticleStore, OrderLine, ProductService, ProductStore, StockLedger};
use message_bus::envelope::TaggedEvent;
use message_bus::{Handler, HandlerError, Message, Streamer, Subscriber};

use crate::error::{ReconcileError, Result};
use crate::events::OrderEvent;

/// Consumes order events and adjusts the stock of every product component.
///
/// `OrderCreated` consumes stock, `OrderDeleted` restores it, `OrderUpdated`
/// has no stock effect. The first failing line aborts the rest of the event;
/// writes already made stay applied.
pub struct StockReconciliationHandler<P: ProductStore, A: ArticleStore> {
    products: ProductService<P>,
    ledger: StockLedger<A>,
}

impl<P: ProductStore, A: ArticleStore> StockReconciliationHandler<P, A> {
    pub fn new(products: ProductService<P>, ledger: StockLedger<A>) -> Self {
        Self { products, ledger }
    }

    /// Decodes `message` and applies it to stock.
    #[tracing::instrument(
        skip(self, message),
        fields(message_id = %message.uuid(), correlation_id = message.correlation_label())
    )]
    pub async fn reconcile(&self, message: &Message) -> Result<()> {
        let event = OrderEvent::from_message(message)?;
        let order = event.order();
        tracing::debug!(
            event = event.event_name(),
            order_id = %order.id,
            lines = order.lines.len(),
            "reconciling order event"
        );

        match &event {
            OrderEvent::Created(order) => {
                for line in &order.lines {
                    let components = self.products.get_by_id(line.product_id).await?.articles;
                    self.ledger
                        .decrease_stock_by(&components, quantity(line)?)
                        .await?;
                }
            }
            OrderEvent::Deleted(order) => {
                for line in &order.lines {
                    let components = self.products.get_by_id(line.product_id).await?.articles;
                    self.ledger
                        .increase_stock_by(&components, quantity(line)?)
                        .await?;
                }
            }
            OrderEvent::Updated(order) => {
                // Lines are replaced on update but stock is not re-balanced.
                tracing::debug!(order_id = %order.id, "order update has no stock effect");
            }
        }

        metrics::counter!("order_events_processed_total", "event" => event.event_name())
            .increment(1);
        Ok(())
    }
}

impl<P, A> StockReconciliationHandler<P, A>
where
    P: ProductStore + 'static,
    A: ArticleStore + 'static,
{
    /// Subscribes the handler to `topic` on the streamer's router.
    ///
    /// Returns the registration key.
    pub fn register(
        self,
        streamer: &Streamer,
        channel: &dyn Subscriber,
        topic: &str,
    ) -> message_bus::Result<String> {
        let key = streamer.register_handler(channel, topic, self)?;
        tracing::info!(handler = %key, topic, "stock reconciliation handler registered");
        Ok(key)
    }
}

fn quantity(line: &OrderLine) -> Result<i64> {
    i64::try_from(line.quantity).map_err(|_| ReconcileError::QuantityOutOfRange {
        line_id: line.id,
        quantity: line.quantity,
    })
}

#[async_trait]
impl<P: ProductStore, A: ArticleStore> Handler for StockReconciliationHandler<P, A> {
    async fn handle(&self, message: &Message) -> std::result::Result<Vec<Message>, HandlerError> {
        self.reconcile(message).await?;
        Ok(Vec::new())
    }
}
