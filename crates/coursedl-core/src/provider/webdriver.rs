//! Blocking WebDriver adapter.
//!
//! Drives a browser through the W3C WebDriver wire protocol (JSON over HTTP,
//! e.g. geckodriver on port 4444) using the same blocking curl stack as the
//! downloader, so the whole pipeline stays single-threaded. Owns the one
//! browser session for the run; the session is deleted on drop.
//!
//! The sign-in flow lives here, not in the walker: any navigation can bounce
//! to the sign-in page, and the walker should only ever see ready pages.

use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::{LessonItem, PageContentProvider, ProviderError, SectionHeading};
use crate::config::CoursedlConfig;

/// W3C element identifier key in element reference payloads.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// How often the ready-state poll re-checks the page.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Sign-in credentials, usually sourced from the config file.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A remote element reference scoped to the current session.
#[derive(Debug, Clone)]
struct ElementRef(String);

enum Method {
    Get,
    Post,
    Delete,
}

/// Provider backed by a live WebDriver session.
pub struct WebDriverProvider {
    endpoint: String,
    session_id: String,
    page_load_timeout: Duration,
    credentials: Option<Credentials>,
}

impl WebDriverProvider {
    /// Creates a browser session against the configured driver endpoint.
    pub fn connect(config: &CoursedlConfig) -> Result<Self, ProviderError> {
        let mut args: Vec<&str> = Vec::new();
        if config.headless {
            args.push("-headless");
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args }
                }
            }
        });

        let endpoint = config.webdriver_url.trim_end_matches('/').to_string();
        let value = request(&endpoint, Method::Post, "/session", Some(&body), None)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Protocol("missing sessionId in response".into()))?
            .to_string();

        Ok(WebDriverProvider {
            endpoint,
            session_id,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            credentials: config.credentials(),
        })
    }

    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let path = format!("/session/{}{}", self.session_id, path);
        request(
            &self.endpoint,
            method,
            &path,
            body,
            Some(self.page_load_timeout + Duration::from_secs(30)),
        )
    }

    fn title(&self) -> Result<String, ProviderError> {
        let value = self.call(Method::Get, "/title", None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn current_url(&self) -> Result<String, ProviderError> {
        let value = self.call(Method::Get, "/url", None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, ProviderError> {
        let body = json!({ "script": script, "args": args });
        self.call(Method::Post, "/execute/sync", Some(&body))
    }

    fn ready_state(&self) -> Result<String, ProviderError> {
        let value = self.execute("return document.readyState;", Vec::new())?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn find(&self, using: &str, selector: &str) -> Result<ElementRef, ProviderError> {
        let body = json!({ "using": using, "value": selector });
        let value = self.call(Method::Post, "/element", Some(&body))?;
        parse_element(&value)
    }

    fn find_all(&self, using: &str, selector: &str) -> Result<Vec<ElementRef>, ProviderError> {
        let body = json!({ "using": using, "value": selector });
        let value = self.call(Method::Post, "/elements", Some(&body))?;
        parse_elements(&value)
    }

    fn find_within(
        &self,
        parent: &ElementRef,
        using: &str,
        selector: &str,
    ) -> Result<ElementRef, ProviderError> {
        let body = json!({ "using": using, "value": selector });
        let value = self.call(
            Method::Post,
            &format!("/element/{}/element", parent.0),
            Some(&body),
        )?;
        parse_element(&value)
    }

    fn find_all_within(
        &self,
        parent: &ElementRef,
        using: &str,
        selector: &str,
    ) -> Result<Vec<ElementRef>, ProviderError> {
        let body = json!({ "using": using, "value": selector });
        let value = self.call(
            Method::Post,
            &format!("/element/{}/elements", parent.0),
            Some(&body),
        )?;
        parse_elements(&value)
    }

    fn text(&self, element: &ElementRef) -> Result<String, ProviderError> {
        let value = self.call(Method::Get, &format!("/element/{}/text", element.0), None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>, ProviderError> {
        let value = self.call(
            Method::Get,
            &format!("/element/{}/attribute/{}", element.0, name),
            None,
        )?;
        Ok(value.as_str().map(str::to_string))
    }

    fn click(&self, element: &ElementRef) -> Result<(), ProviderError> {
        self.call(
            Method::Post,
            &format!("/element/{}/click", element.0),
            Some(&json!({})),
        )?;
        Ok(())
    }

    /// Dispatches a click through script, for elements a native click cannot
    /// reach (overlapped cards, sidebar toggles).
    fn script_click(&self, element: &ElementRef) -> Result<(), ProviderError> {
        self.execute(
            "arguments[0].click();",
            vec![json!({ ELEMENT_KEY: element.0 })],
        )?;
        Ok(())
    }

    fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), ProviderError> {
        self.call(
            Method::Post,
            &format!("/element/{}/value", element.0),
            Some(&json!({ "text": text })),
        )?;
        Ok(())
    }

    /// Clicks the "Show Navigations" toggle when the sidebar is hidden.
    fn show_sidebar(&self) -> Result<(), ProviderError> {
        let toggles = self.find_all("xpath", "//a[contains(@title,\"Show Navigations\")]")?;
        if let Some(toggle) = toggles.first() {
            self.script_click(toggle)?;
        }
        Ok(())
    }

    /// Fills and submits the sign-in form with the configured credentials.
    fn sign_in(&self) -> Result<(), ProviderError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or(ProviderError::MissingCredentials)?;
        tracing::info!(email = %creds.email, "sign-in page detected, submitting credentials");

        let email_form = self.find("xpath", "//input[contains(@type,'email')]")?;
        let password_form = self.find("xpath", "//input[contains(@type,'password')]")?;
        let buttons = self.find_all("xpath", "//button[contains(text(), 'Sign In')]")?;
        // The first match is the header link; the form's submit comes after.
        let submit = buttons
            .last()
            .ok_or_else(|| ProviderError::ElementNotFound("sign-in submit button".into()))?;

        self.send_keys(&email_form, &creds.email)?;
        self.send_keys(&password_form, &creds.password)?;
        self.click(submit)?;

        let deadline = Instant::now() + self.page_load_timeout;
        while Instant::now() < deadline {
            if !self.title()?.contains("Sign In") {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Err(ProviderError::LoginFailed {
            email: creds.email.clone(),
        })
    }

    fn main_content(&self) -> Result<ElementRef, ProviderError> {
        self.find("css selector", "#main-layout-content")
    }

    fn lesson_item_at(&self, index: usize) -> Result<(ElementRef, ElementRef), ProviderError> {
        let content = self.main_content()?;
        let items = self.find_all_within(&content, "tag name", "li")?;
        let item = items
            .into_iter()
            .nth(index)
            .ok_or_else(|| ProviderError::ElementNotFound(format!("lesson item {}", index)))?;
        let anchor = self.find_within(&item, "tag name", "a")?;
        Ok((item, anchor))
    }

    fn read_lesson_item(&self, item: &ElementRef, anchor: &ElementRef) -> Result<LessonItem, ProviderError> {
        let title = match self.find_within(item, "tag name", "h4") {
            Ok(heading) => self.text(&heading)?,
            Err(ProviderError::ElementNotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };
        let href = self.attribute(anchor, "href")?.unwrap_or_default();
        Ok(LessonItem { title, href })
    }
}

impl PageContentProvider for WebDriverProvider {
    fn load_page(&mut self, url: &str) -> Result<(), ProviderError> {
        self.call(Method::Post, "/url", Some(&json!({ "url": url })))?;

        let deadline = Instant::now() + self.page_load_timeout;
        while Instant::now() < deadline {
            let title = self.title()?;
            if title.contains("Sign In") {
                self.sign_in()?;
                continue;
            }
            if !title.contains("Loading") && self.ready_state()? == "complete" {
                tracing::debug!(url, "page ready");
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Err(ProviderError::PageLoadTimeout {
            url: self
                .current_url()
                .unwrap_or_else(|_| url.to_string()),
            timeout_secs: self.page_load_timeout.as_secs(),
        })
    }

    fn course_title(&mut self) -> Result<Option<String>, ProviderError> {
        self.show_sidebar()?;
        let sidebar = match self.find("css selector", "#main-layout-sidebar") {
            Ok(sidebar) => sidebar,
            Err(ProviderError::ElementNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.find_within(&sidebar, "tag name", "h4") {
            Ok(heading) => {
                let title = self.text(&heading)?;
                Ok((!title.is_empty()).then_some(title))
            }
            Err(ProviderError::ElementNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn section_headings(&mut self) -> Result<Vec<SectionHeading>, ProviderError> {
        let content = self.main_content()?;
        let headings = self.find_all_within(&content, "tag name", "h2")?;
        let mut sections = Vec::with_capacity(headings.len());
        for heading in &headings {
            // Headings without an anchor are decorative; skip them.
            let anchor = match self.find_within(heading, "tag name", "a") {
                Ok(anchor) => anchor,
                Err(ProviderError::ElementNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let title = self.text(&anchor)?;
            let href = self.attribute(&anchor, "href")?.unwrap_or_default();
            if !href.is_empty() {
                sections.push(SectionHeading { title, href });
            }
        }
        Ok(sections)
    }

    fn lesson_items(&mut self) -> Result<Vec<LessonItem>, ProviderError> {
        let content = self.main_content()?;
        let items = self.find_all_within(&content, "tag name", "li")?;
        let mut lessons = Vec::with_capacity(items.len());
        for item in &items {
            let anchor = match self.find_within(item, "tag name", "a") {
                Ok(anchor) => anchor,
                Err(ProviderError::ElementNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            lessons.push(self.read_lesson_item(item, &anchor)?);
        }
        Ok(lessons)
    }

    fn expand_lesson(&mut self, index: usize) -> Result<LessonItem, ProviderError> {
        let (item, anchor) = self.lesson_item_at(index)?;
        // Closed cards sometimes swallow the native click; fall back to the
        // card itself, then to a script-dispatched click.
        if self.click(&anchor).is_err() && self.click(&item).is_err() {
            self.script_click(&anchor)?;
        }
        let (item, anchor) = self.lesson_item_at(index)?;
        self.read_lesson_item(&item, &anchor)
    }

    fn resource_links(&mut self) -> Result<Vec<String>, ProviderError> {
        self.show_sidebar()?;
        let mut links = Vec::new();

        // Embedded notebook, if the lesson carries one.
        let iframes = self.find_all("xpath", "//iframe[contains(@src,\".ipynb\")]")?;
        for iframe in &iframes {
            if let Some(src) = self.attribute(iframe, "src")? {
                links.push(src);
            }
        }

        // Expand the resource panel (second sidebar heading), then collect
        // archive anchors from the resource tree.
        let sidebar = match self.find("css selector", "#main-layout-sidebar") {
            Ok(sidebar) => sidebar,
            Err(ProviderError::ElementNotFound(_)) => return Ok(links),
            Err(e) => return Err(e),
        };
        let panels = self.find_all_within(&sidebar, "tag name", "h2")?;
        let Some(resources_panel) = panels.get(1) else {
            return Ok(links);
        };
        self.script_click(resources_panel)?;

        let tree = match self.find("css selector", "#tree-resources") {
            Ok(tree) => tree,
            Err(ProviderError::ElementNotFound(_)) => return Ok(links),
            Err(e) => return Err(e),
        };
        let anchors = self.find_all_within(&tree, "xpath", ".//a[contains(@href,'.zip')]")?;
        for anchor in &anchors {
            if let Some(href) = self.attribute(anchor, "href")? {
                links.push(href);
            }
        }
        Ok(links)
    }
}

impl Drop for WebDriverProvider {
    fn drop(&mut self) {
        let path = format!("/session/{}", self.session_id);
        if let Err(e) = request(&self.endpoint, Method::Delete, &path, None, None) {
            tracing::debug!("could not close webdriver session: {}", e);
        }
    }
}

/// One blocking HTTP exchange with the driver.
fn request(
    endpoint: &str,
    method: Method,
    path: &str,
    body: Option<&Value>,
    timeout: Option<Duration>,
) -> Result<Value, ProviderError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(&format!("{}{}", endpoint, path))?;
    easy.connect_timeout(Duration::from_secs(10))?;
    easy.timeout(timeout.unwrap_or_else(|| Duration::from_secs(60)))?;

    let payload;
    match method {
        Method::Get => {}
        Method::Post => {
            easy.post(true)?;
            let mut headers = curl::easy::List::new();
            headers.append("Content-Type: application/json")?;
            easy.http_headers(headers)?;
            payload = body.cloned().unwrap_or_else(|| json!({})).to_string();
            easy.post_fields_copy(payload.as_bytes())?;
        }
        Method::Delete => {
            easy.custom_request("DELETE")?;
        }
    }

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    let parsed: Value = serde_json::from_slice(&response)
        .map_err(|e| ProviderError::Protocol(format!("bad driver response: {}", e)))?;

    if !(200..300).contains(&status) {
        let error = parsed["value"]["error"].as_str().unwrap_or("unknown");
        let message = parsed["value"]["message"].as_str().unwrap_or("");
        return Err(match error {
            "stale element reference" => ProviderError::StaleElement,
            "no such element" => ProviderError::ElementNotFound(message.to_string()),
            _ => ProviderError::Protocol(format!("{} (HTTP {}): {}", error, status, message)),
        });
    }

    Ok(parsed
        .get("value")
        .cloned()
        .unwrap_or(Value::Null))
}

fn parse_element(value: &Value) -> Result<ElementRef, ProviderError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
        .ok_or_else(|| ProviderError::Protocol("missing element reference".into()))
}

fn parse_elements(value: &Value) -> Result<Vec<ElementRef>, ProviderError> {
    value
        .as_array()
        .ok_or_else(|| ProviderError::Protocol("expected element array".into()))?
        .iter()
        .map(parse_element)
        .collect()
}
