//! Built-in step definitions
//!
//! Registered under the `stepDef` glue location:
//! - `stepDef.common`: scenario variables
//! - `stepDef.api`: HTTP requests and response assertions, plus the
//!   `@json` header hook and response logging after every scenario
//! - `stepDef.web`: page fetching and content assertions

use anyhow::{bail, Context};
use futures::FutureExt;
use regex::Regex;
use tracing::debug;

use super::registry::{StepContext, StepFuture, StepRegistry};
use super::world::World;
use crate::error::RunnerResult;
use crate::http::HttpRequest;

pub fn register_common(registry: &mut StepRegistry) -> RunnerResult<()> {
    registry
        .given("I set {string} to {string}", set_variable)?
        .then("{string} should equal {string}", values_equal)?;
    Ok(())
}

pub fn register_api(registry: &mut StepRegistry) -> RunnerResult<()> {
    registry
        .given("the base URL is {string}", set_base_url)?
        .given("I set the header {string} to {string}", set_header)?
        .when("I send a {word} request to {string}", send_request)?
        .then("the response status should be {int}", response_status)?
        .then("the response body should contain {string}", response_contains)?
        .then("the response header {string} should be {string}", response_header)?
        .then("the JSON field {string} should be {string}", json_field_equals)?
        .then("I store the JSON field {string} as {string}", store_json_field)?
        .before("JSON headers", Some("@json"), json_headers)?
        .after("log last response", None, log_last_response)?;
    Ok(())
}

pub fn register_web(registry: &mut StepRegistry) -> RunnerResult<()> {
    registry
        .given("I open the page {string}", open_page)?
        .then("the page title should be {string}", page_title)?
        .then("the page should contain {string}", page_contains)?
        .then("the page should contain a link to {string}", page_links_to)?;
    Ok(())
}

fn set_variable<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let value = world.interpolate(ctx.arg(1)?);
        world.vars.insert(ctx.arg(0)?.to_string(), value);
        Ok(())
    }
    .boxed()
}

fn values_equal<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let left = world.interpolate(ctx.arg(0)?);
        let right = world.interpolate(ctx.arg(1)?);
        if left != right {
            bail!("expected '{right}' but was '{left}'");
        }
        Ok(())
    }
    .boxed()
}

fn set_base_url<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        world.base_url = Some(world.interpolate(ctx.arg(0)?));
        Ok(())
    }
    .boxed()
}

fn set_header<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let value = world.interpolate(ctx.arg(1)?);
        world.headers.insert(ctx.arg(0)?.to_string(), value);
        Ok(())
    }
    .boxed()
}

fn send_request<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let url = world.url(&world.interpolate(ctx.arg(1)?))?;
        let mut request = HttpRequest::new(ctx.arg(0)?, url).headers(world.headers.clone());
        if let Some(body) = &ctx.docstring {
            request = request.body(world.interpolate(body));
        }

        let response = world.http().send(request).await?;
        world.response = Some(response);
        Ok(())
    }
    .boxed()
}

fn response_status<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let expected: u16 = ctx.parse(0)?;
        let actual = world.last_response()?.status_code;
        if actual != expected {
            bail!("expected status {expected} but was {actual}");
        }
        Ok(())
    }
    .boxed()
}

fn response_contains<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let needle = world.interpolate(ctx.arg(0)?);
        if !world.last_response()?.body_contains(&needle) {
            bail!("response body does not contain '{needle}'");
        }
        Ok(())
    }
    .boxed()
}

fn response_header<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let name = ctx.arg(0)?;
        let expected = world.interpolate(ctx.arg(1)?);
        let actual = world
            .last_response()?
            .header(name)
            .with_context(|| format!("response has no '{name}' header"))?;
        if actual != expected {
            bail!("expected header '{name}' to be '{expected}' but was '{actual}'");
        }
        Ok(())
    }
    .boxed()
}

/// Default JSON content negotiation; headers a scenario sets win
fn json_headers<'a>(world: &'a mut World) -> StepFuture<'a> {
    async move {
        for name in ["Accept", "Content-Type"] {
            world
                .headers
                .entry(name.to_string())
                .or_insert_with(|| "application/json".to_string());
        }
        Ok(())
    }
    .boxed()
}

fn log_last_response<'a>(world: &'a mut World) -> StepFuture<'a> {
    async move {
        if let Some(response) = &world.response {
            debug!(
                "Last response: status {}, {} byte(s) in {}ms",
                response.status_code,
                response.body.len(),
                response.duration_ms
            );
        }
        Ok(())
    }
    .boxed()
}

/// Render a JSON value the way a feature file would spell it
fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_field_equals<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let path = ctx.arg(0)?;
        let expected = world.interpolate(ctx.arg(1)?);
        let actual = json_text(&world.last_response()?.json_field(path)?);
        if actual != expected {
            bail!("expected JSON field '{path}' to be '{expected}' but was '{actual}'");
        }
        Ok(())
    }
    .boxed()
}

fn store_json_field<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let value = json_text(&world.last_response()?.json_field(ctx.arg(0)?)?);
        world.vars.insert(ctx.arg(1)?.to_string(), value);
        Ok(())
    }
    .boxed()
}

fn open_page<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let url = world.url(&world.interpolate(ctx.arg(0)?))?;
        let request = HttpRequest::get(url.clone()).headers(world.headers.clone());
        let page = world.http().send(request).await?;
        if !page.is_success() {
            bail!("page {url} answered with status {}", page.status_code);
        }
        world.page = Some(page);
        Ok(())
    }
    .boxed()
}

/// Text of the first `<title>` element
pub fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Whether the page has an anchor pointing at `target`
pub fn has_link_to(html: &str, target: &str) -> bool {
    let pattern = format!(
        r#"(?i)<a\s[^>]*href\s*=\s*["']{}["']"#,
        regex::escape(target)
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(html))
}

fn page_title<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let expected = world.interpolate(ctx.arg(0)?);
        let title = extract_title(&world.current_page()?.body)
            .context("page has no <title> element")?;
        if title != expected {
            bail!("expected page title '{expected}' but was '{title}'");
        }
        Ok(())
    }
    .boxed()
}

fn page_contains<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let needle = world.interpolate(ctx.arg(0)?);
        if !world.current_page()?.body_contains(&needle) {
            bail!("page does not contain '{needle}'");
        }
        Ok(())
    }
    .boxed()
}

fn page_links_to<'a>(world: &'a mut World, ctx: StepContext) -> StepFuture<'a> {
    async move {
        let target = world.interpolate(ctx.arg(0)?);
        if !has_link_to(&world.current_page()?.body, &target) {
            bail!("page has no link to '{target}'");
        }
        Ok(())
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glue::registry::StepMatch;
    use crate::glue::world::test_world;
    use crate::http::HttpResponse;
    use crate::models::HookKind;
    use std::collections::HashMap;

    fn full_registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        register_common(&mut registry).unwrap();
        register_api(&mut registry).unwrap();
        register_web(&mut registry).unwrap();
        registry
    }

    async fn run(registry: &StepRegistry, world: &mut World, text: &str) -> anyhow::Result<()> {
        match registry.find(text) {
            StepMatch::Matched { definition, args } => {
                let ctx = StepContext {
                    text: text.to_string(),
                    args,
                    ..Default::default()
                };
                (definition.handler)(world, ctx).await
            }
            other => panic!("'{text}' did not resolve: {other:?}"),
        }
    }

    fn json_response(body: &str, status: u16) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        HttpResponse {
            status_code: status,
            headers,
            body: body.to_string(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_builtin_steps_are_unambiguous() {
        let registry = full_registry();
        for text in [
            r#"I set "name" to "widget""#,
            r#"I set the header "Accept" to "application/json""#,
            r#"the page should contain "Welcome""#,
            r#"the page should contain a link to "/about""#,
            r#"I send a GET request to "/items""#,
        ] {
            assert!(
                matches!(registry.find(text), StepMatch::Matched { .. }),
                "{text} should resolve to exactly one step"
            );
        }
    }

    #[tokio::test]
    async fn test_json_hook_applies_to_json_scenarios_only() {
        let registry = full_registry();
        let plain = vec!["api".to_string()];
        let json = vec!["api".to_string(), "json".to_string()];
        assert!(registry.hooks_for(HookKind::Before, &plain).is_empty());

        let hooks = registry.hooks_for(HookKind::Before, &json);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].name, "JSON headers");

        let mut world = test_world();
        world
            .headers
            .insert("Accept".to_string(), "text/plain".to_string());
        (hooks[0].handler)(&mut world).await.unwrap();
        assert_eq!(world.headers["Accept"], "text/plain");
        assert_eq!(world.headers["Content-Type"], "application/json");
    }

    #[tokio::test]
    async fn test_response_logging_runs_after_every_scenario() {
        let registry = full_registry();
        let hooks = registry.hooks_for(HookKind::After, &[]);
        assert_eq!(hooks.len(), 1);

        let mut world = test_world();
        (hooks[0].handler)(&mut world).await.unwrap();
        world.response = Some(json_response("{}", 200));
        (hooks[0].handler)(&mut world).await.unwrap();
    }

    #[tokio::test]
    async fn test_variables_and_equality() {
        let registry = full_registry();
        let mut world = test_world();

        run(&registry, &mut world, r#"I set "id" to "42""#).await.unwrap();
        run(&registry, &mut world, r#""${id}" should equal "42""#).await.unwrap();
        assert!(run(&registry, &mut world, r#""${id}" should equal "43""#)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_response_assertions() {
        let registry = full_registry();
        let mut world = test_world();

        assert!(run(&registry, &mut world, "the response status should be 200")
            .await
            .is_err());

        world.response = Some(json_response(r#"{"user": {"id": 7, "name": "ada"}}"#, 200));
        run(&registry, &mut world, "the response status should be 200").await.unwrap();
        run(&registry, &mut world, r#"the response body should contain "ada""#)
            .await
            .unwrap();
        run(
            &registry,
            &mut world,
            r#"the response header "Content-Type" should be "application/json""#,
        )
        .await
        .unwrap();
        run(&registry, &mut world, r#"the JSON field "user.id" should be "7""#)
            .await
            .unwrap();
        run(&registry, &mut world, r#"I store the JSON field "user.name" as "who""#)
            .await
            .unwrap();
        assert_eq!(world.vars.get("who").map(String::as_str), Some("ada"));

        let err = run(&registry, &mut world, "the response status should be 404")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected status 404 but was 200"));
    }

    #[tokio::test]
    async fn test_send_request_without_base_url_fails() {
        let registry = full_registry();
        let mut world = test_world();
        let err = run(&registry, &mut world, r#"I send a GET request to "/items""#)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Relative URL '/items' needs a base URL");
    }

    #[tokio::test]
    async fn test_page_assertions() {
        let registry = full_registry();
        let mut world = test_world();
        world.page = Some(json_response(
            r#"<html><head><title>
                Home Page
            </title></head><body>Welcome <a class="nav" href="/about">About</a></body></html>"#,
            200,
        ));

        run(&registry, &mut world, r#"the page title should be "Home Page""#)
            .await
            .unwrap();
        run(&registry, &mut world, r#"the page should contain "Welcome""#)
            .await
            .unwrap();
        run(&registry, &mut world, r#"the page should contain a link to "/about""#)
            .await
            .unwrap();
        assert!(
            run(&registry, &mut world, r#"the page should contain a link to "/contact""#)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("<TITLE lang=\"en\">A  b</TITLE>").as_deref(),
            Some("A b")
        );
        assert!(extract_title("<html></html>").is_none());
    }
}
