//! [`Transport`] implementation over a driven page.

use std::time::Duration;

use async_trait::async_trait;

use kirana_core::app_config::AppConfig;
use kirana_engine::action::{Action, PageScript, PageSnapshot, PageStep, RawResult};
use kirana_engine::operation::Operation;
use kirana_engine::transport::{Transport, TransportFault};

use crate::driver::{PageDriver, PageFault};
use crate::selectors;

/// How often outcome probes are re-checked while a page settles.
const PROBE_INTERVAL: Duration = Duration::from_millis(250);

pub struct PageTransport<D> {
    driver: D,
    wait_timeout: Duration,
}

impl<D: PageDriver> PageTransport<D> {
    #[must_use]
    pub fn new(driver: D, config: &AppConfig) -> Self {
        Self {
            driver,
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
        }
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    async fn run_step(&self, step: &PageStep) -> Result<(), PageFault> {
        match step {
            PageStep::Goto(path) => self.driver.goto(path).await,
            PageStep::Click(selector) => self.driver.click(selector).await,
            PageStep::ClickByText(needle) => self.driver.click_text(needle).await,
            PageStep::ClickNth(selector, index) => self.driver.click_nth(selector, *index).await,
            PageStep::ClickLast(selector) => self.driver.click_last(selector).await,
            PageStep::ClickIfVisible(selector) => {
                if self.driver.is_visible(selector).await? {
                    self.driver.click(selector).await
                } else {
                    Ok(())
                }
            }
            PageStep::Fill { selector, text } => self.driver.fill(selector, text).await,
            PageStep::Press(key) => self.driver.press(key).await,
            PageStep::WaitFor(selector) => {
                self.driver.wait_for(selector, self.wait_timeout).await
            }
        }
    }

    /// Poll the script's outcome probes until one side shows or the wait
    /// budget runs out. Scripts without probes settle immediately; scripts
    /// marked `snapshot_on_timeout` settle empty instead of faulting.
    async fn settle(&self, script: &PageScript) -> Result<(Vec<String>, Vec<String>), PageFault> {
        if script.confirm.is_empty() && script.deny.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let deadline = tokio::time::Instant::now() + self.wait_timeout;
        loop {
            let mut confirmed = Vec::new();
            let mut denied = Vec::new();
            for marker in &script.deny {
                if self.driver.is_visible(marker).await? {
                    denied.push(marker.clone());
                }
            }
            for marker in &script.confirm {
                if self.driver.is_visible(marker).await? {
                    confirmed.push(marker.clone());
                }
            }
            if !denied.is_empty() || !confirmed.is_empty() {
                return Ok((confirmed, denied));
            }
            if tokio::time::Instant::now() >= deadline {
                if script.snapshot_on_timeout {
                    return Ok((Vec::new(), Vec::new()));
                }
                return Err(PageFault::Timeout {
                    what: format!("outcome probes {:?}", script.confirm),
                    seconds: self.wait_timeout.as_secs(),
                });
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn run_script(&self, script: &PageScript) -> Result<PageSnapshot, PageFault> {
        for step in &script.steps {
            self.run_step(step).await?;
        }
        let (confirmed, denied) = self.settle(script).await?;
        let items = match &script.collect {
            Some(collect) => {
                self.driver
                    .collect(&collect.selector, collect.id_attr.as_deref())
                    .await?
            }
            None => Vec::new(),
        };
        let text = self.driver.visible_text().await?;
        Ok(PageSnapshot {
            text,
            confirmed,
            denied,
            items,
        })
    }
}

fn into_fault(fault: PageFault) -> TransportFault {
    match fault {
        PageFault::NotFound(what) => TransportFault::ElementNotFound(what),
        PageFault::Timeout { what, seconds } => TransportFault::Timeout { what, seconds },
        PageFault::Gone(why) => TransportFault::SessionLost(why),
        PageFault::Other(why) => TransportFault::Network(why),
    }
}

#[async_trait]
impl<D: PageDriver> Transport for PageTransport<D> {
    /// Relaunch the page session if the browser died since the last
    /// operation.
    async fn ensure_started(&self) -> Result<(), TransportFault> {
        if self.driver.is_alive().await {
            return Ok(());
        }
        tracing::info!("page session not alive, starting it");
        self.driver.start().await.map_err(into_fault)
    }

    fn candidates(&self, op: &Operation) -> Vec<Action> {
        selectors::candidates(op)
    }

    async fn execute(&self, action: &Action) -> Result<RawResult, TransportFault> {
        match action {
            Action::Page(script) => Ok(RawResult::Page(
                self.run_script(script).await.map_err(into_fault)?,
            )),
            Action::Http(call) => Err(TransportFault::Network(format!(
                "page transport cannot issue endpoint calls ({})",
                call.path
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use kirana_engine::action::PageItem;
    use kirana_engine::ops::{OrderService, ProductRef};
    use kirana_engine::Outcome;

    use super::*;

    /// A scriptable in-memory page: visible markers, card contents, and a
    /// log of clicks.
    #[derive(Default)]
    struct FakePage {
        alive: Mutex<bool>,
        visible: Mutex<HashSet<String>>,
        cards: Mutex<Vec<PageItem>>,
        text: Mutex<String>,
        clicks: Mutex<Vec<String>>,
    }

    impl FakePage {
        fn show(&self, marker: &str) {
            self.visible.lock().unwrap().insert(marker.to_owned());
        }

        fn set_cards(&self, cards: Vec<PageItem>) {
            *self.cards.lock().unwrap() = cards;
        }

        fn clicks(&self) -> Vec<String> {
            self.clicks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn start(&self) -> Result<(), PageFault> {
            *self.alive.lock().unwrap() = true;
            Ok(())
        }

        async fn is_alive(&self) -> bool {
            *self.alive.lock().unwrap()
        }

        async fn goto(&self, _path: &str) -> Result<(), PageFault> {
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<(), PageFault> {
            if !self.visible.lock().unwrap().contains(selector) {
                return Err(PageFault::NotFound(selector.to_owned()));
            }
            self.clicks.lock().unwrap().push(selector.to_owned());
            Ok(())
        }

        async fn click_text(&self, needle: &str) -> Result<(), PageFault> {
            self.clicks.lock().unwrap().push(format!("text:{needle}"));
            Ok(())
        }

        async fn click_nth(&self, selector: &str, index: usize) -> Result<(), PageFault> {
            self.clicks
                .lock()
                .unwrap()
                .push(format!("{selector}[{index}]"));
            Ok(())
        }

        async fn click_last(&self, selector: &str) -> Result<(), PageFault> {
            self.clicks
                .lock()
                .unwrap()
                .push(format!("{selector}[last]"));
            Ok(())
        }

        async fn fill(&self, selector: &str, _text: &str) -> Result<(), PageFault> {
            self.clicks.lock().unwrap().push(format!("fill:{selector}"));
            Ok(())
        }

        async fn press(&self, _key: &str) -> Result<(), PageFault> {
            Ok(())
        }

        async fn is_visible(&self, marker: &str) -> Result<bool, PageFault> {
            Ok(self.visible.lock().unwrap().contains(marker)
                || self.text.lock().unwrap().contains(marker))
        }

        async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<(), PageFault> {
            if self.visible.lock().unwrap().contains(selector) {
                Ok(())
            } else {
                Err(PageFault::Timeout {
                    what: selector.to_owned(),
                    seconds: 0,
                })
            }
        }

        async fn visible_text(&self) -> Result<String, PageFault> {
            Ok(self.text.lock().unwrap().clone())
        }

        async fn collect(
            &self,
            _selector: &str,
            _id_attr: Option<&str>,
        ) -> Result<Vec<PageItem>, PageFault> {
            Ok(self.cards.lock().unwrap().clone())
        }
    }

    fn config() -> AppConfig {
        let mut config = kirana_core::config::load_app_config_from_env().expect("defaults");
        config.wait_timeout_secs = 1;
        config.session_path =
            std::env::temp_dir().join(format!("kirana-browser-test-{}.json", std::process::id()));
        config
    }

    fn milk_card() -> PageItem {
        PageItem {
            id: Some("381406".to_owned()),
            text: "Amul Taaza Toned Milk\n500 ml\n₹27\nADD".to_owned(),
        }
    }

    #[tokio::test]
    async fn dead_session_is_restarted_before_the_operation() {
        let page = FakePage::default();
        page.show("div[role='button'][id]");
        page.set_cards(vec![milk_card()]);
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);

        let result = svc
            .search("milk")
            .await
            .expect("search over a freshly started page")
            .into_completed()
            .expect("store open");
        assert_eq!(result.products.len(), 1);
        assert!(svc.transport().driver().is_alive().await);
    }

    #[tokio::test]
    async fn search_scrapes_cards_into_products() {
        let page = FakePage::default();
        page.show("div[role='button'][id]");
        page.set_cards(vec![milk_card()]);
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);

        let result = svc
            .search("milk")
            .await
            .expect("search")
            .into_completed()
            .expect("store open");
        assert_eq!(result.products[0].id, "381406");
        assert_eq!(result.products[0].name, "Amul Taaza Toned Milk");
        assert!((result.products[0].price - 27.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn add_click_confirms_on_the_cart_strip() {
        let page = FakePage::default();
        page.show("div[role='button'][id]");
        page.set_cards(vec![milk_card()]);
        page.show(".CartButton__Button");
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);

        svc.search("milk").await.expect("search");
        let outcome = svc
            .add_to_cart(&ProductRef::Index(0), 2)
            .await
            .expect("add")
            .into_completed()
            .expect("store open");
        assert_eq!(outcome.achieved, 2);
        assert!(!outcome.capped);
        let clicks = svc.transport().driver().clicks();
        let add_clicks = clicks
            .iter()
            .filter(|c| c.contains("div[id='381406'] button"))
            .count();
        assert_eq!(add_clicks, 2, "one add plus one increment");
    }

    #[tokio::test]
    async fn cap_toast_caps_the_quantity() {
        let page = FakePage::default();
        page.show("div[role='button'][id]");
        page.set_cards(vec![milk_card()]);
        page.show(".CartButton__Button");
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);

        svc.search("milk").await.expect("search");
        // The cap toast renders from now on.
        *svc.transport().driver().text.lock().unwrap() =
            "Sorry, you can't add more of this item".to_owned();
        let outcome = svc
            .add_to_cart(&ProductRef::Index(0), 3)
            .await
            .expect("capped add completes")
            .into_completed()
            .expect("store open");
        assert_eq!(outcome.achieved, 0);
        assert!(outcome.capped);
    }

    #[tokio::test]
    async fn checkout_reports_the_address_screen() {
        let page = FakePage::default();
        page.show(".CartButton__Button");
        page.show(".AddressList__AddressItemWrapper");
        let cfg = config();
        let transport = PageTransport::new(page, &cfg);

        let svc = OrderService::new(transport, &cfg);
        svc.transport().driver().start().await.expect("start");
        let Outcome::Completed(state) = svc.checkout().await.expect("checkout") else {
            panic!("store open");
        };
        assert_eq!(state, kirana_core::outcome::CheckoutState::AddressRequired);
    }

    #[tokio::test]
    async fn unrecognized_post_checkout_screen_reports_unknown() {
        let page = FakePage::default();
        // Only the proceed strip renders; neither the address screen nor
        // the payment widget ever shows up.
        page.show(".CartButton__Button");
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);
        svc.transport().driver().start().await.expect("start");

        let Outcome::Completed(state) = svc.checkout().await.expect("checkout") else {
            panic!("store open");
        };
        assert_eq!(state, kirana_core::outcome::CheckoutState::Unknown);
    }

    #[tokio::test]
    async fn upi_handle_entry_confirms_on_the_rendered_widget() {
        let page = FakePage::default();
        page.show("#payment_widget");
        let cfg = config();
        let svc = OrderService::new(PageTransport::new(page, &cfg), &cfg);
        svc.transport().driver().start().await.expect("start");

        let outcome = svc
            .enter_payment_detail(kirana_core::models::PaymentMethod::Upi, "user@bank")
            .await
            .expect("detail entry");
        assert!(matches!(outcome, Outcome::Completed(())));
        assert!(svc
            .transport()
            .driver()
            .clicks()
            .iter()
            .any(|c| c == "fill:#payment_widget input"));
    }
}
