//! PostgREST adapter for the hosted backend's `environments` tables.

use crate::store::error::{
    StoreErrorContext, invalid_response, map_http_error, map_transport_error, timeout_error,
};
use codex_env_api::v1::{
    EnvironmentIdDto, EnvironmentRowDto, environment_insert_from_new, patch_body, record_from_row,
    variable_inserts,
};
use codex_env_config::StoreEndpoint;
use codex_env_domain::{
    EnvironmentId, EnvironmentPatch, EnvironmentRecord, EnvironmentVariable, NewEnvironment,
};
use codex_env_ports::{BoxFuture, EnvironmentStorePort};
use codex_env_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const APIKEY: HeaderName = HeaderName::from_static("apikey");
const ACCEPT_PROFILE: HeaderName = HeaderName::from_static("accept-profile");
const CONTENT_PROFILE: HeaderName = HeaderName::from_static("content-profile");
const PREFER: HeaderName = HeaderName::from_static("prefer");

const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";

/// PostgREST store configuration.
#[derive(Debug, Clone)]
pub struct PostgrestStoreConfig {
    /// Project URL; `/rest/v1` is appended unless already present.
    pub base_url: Box<str>,
    /// Public API key.
    pub anon_key: SecretString,
    /// Session token used as bearer; the anon key is used when absent.
    pub access_token: Option<SecretString>,
    /// Schema selected through the profile headers.
    pub schema: Box<str>,
    /// Environments table.
    pub environments_table: Box<str>,
    /// Environment variables table.
    pub variables_table: Box<str>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl PostgrestStoreConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "store base URL is required",
            ));
        }
        if self.anon_key.expose().trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "store anon key is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "store timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl From<StoreEndpoint> for PostgrestStoreConfig {
    fn from(endpoint: StoreEndpoint) -> Self {
        Self {
            base_url: endpoint.base_url.as_str().into(),
            anon_key: endpoint.anon_key,
            access_token: endpoint.access_token,
            schema: endpoint.schema,
            environments_table: endpoint.environments_table,
            variables_table: endpoint.variables_table,
            timeout_ms: u64::try_from(endpoint.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Environment store over the PostgREST HTTP API.
#[derive(Clone)]
pub struct PostgrestEnvironmentStore {
    client: reqwest::Client,
    rest_root: Url,
    environments_table: Box<str>,
    variables_table: Box<str>,
    timeout: Duration,
}

impl PostgrestEnvironmentStore {
    /// Build the adapter and its HTTP client.
    pub fn new(config: PostgrestStoreConfig) -> Result<Self> {
        config.validate()?;
        let rest_root = to_rest_root(&config.base_url)?;

        let bearer = config
            .access_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .unwrap_or(&config.anon_key);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(APIKEY, sensitive_header(config.anon_key.expose())?);
        headers.insert(
            AUTHORIZATION,
            sensitive_header(&format!("Bearer {}", bearer.expose()))?,
        );
        let profile = HeaderValue::from_str(&config.schema).map_err(|_| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "store schema contains invalid header characters",
            )
        })?;
        headers.insert(ACCEPT_PROFILE, profile.clone());
        headers.insert(CONTENT_PROFILE, profile);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::store_client_init_failed(),
                    format!("failed to build store client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        Ok(Self {
            client,
            rest_root,
            environments_table: config.environments_table,
            variables_table: config.variables_table,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn environments(&self, operation: &'static str) -> StoreErrorContext<'_> {
        StoreErrorContext {
            operation,
            table: &self.environments_table,
        }
    }

    fn table_url(&self, ctx: StoreErrorContext<'_>, filters: &[(&str, String)]) -> Result<Url> {
        let mut url = self.rest_root.join(ctx.table).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("invalid table name: {error}"),
            )
            .with_metadata("table", ctx.table)
        })?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        ctx: StoreErrorContext<'_>,
        filters: &[(&str, String)],
        prefer: Option<&'static str>,
    ) -> Result<RequestBuilder> {
        let url = self.table_url(ctx, filters)?;
        let builder = self.client.request(method, url);
        Ok(match prefer {
            Some(prefer) => builder.header(PREFER, prefer),
            None => builder,
        })
    }

    /// Send one request and return the raw success body.
    async fn send(
        &self,
        request_ctx: &RequestContext,
        ctx: StoreErrorContext<'_>,
        request: RequestBuilder,
    ) -> Result<Vec<u8>> {
        request_ctx.ensure_not_cancelled(ctx.operation)?;

        let response = tokio::select! {
            () = request_ctx.cancelled() => return Err(cancelled_error(ctx.operation)),
            res = tokio::time::timeout(self.timeout, request.send()) => res,
        };
        let response = match response {
            Ok(result) => result.map_err(|error| map_transport_error(&error, ctx))?,
            Err(_) => return Err(timeout_error(ctx)),
        };

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|error| map_transport_error(&error, ctx))?;

        if !status.is_success() {
            return Err(map_http_error(status.as_u16(), &payload, ctx));
        }
        Ok(payload.to_vec())
    }

    async fn send_for_rows<T: DeserializeOwned>(
        &self,
        request_ctx: &RequestContext,
        ctx: StoreErrorContext<'_>,
        request: RequestBuilder,
    ) -> Result<Vec<T>> {
        let payload = self.send(request_ctx, ctx, request).await?;
        serde_json::from_slice(&payload).map_err(|error| {
            invalid_response(format!("invalid store response: {error}"), ctx)
        })
    }

    async fn insert_environment_row(
        &self,
        request_ctx: &RequestContext,
        environment: &NewEnvironment,
    ) -> Result<EnvironmentId> {
        let ctx = self.environments("postgrest.insert_environment");
        let request = self
            .request(
                Method::POST,
                ctx,
                &[("select", "id".to_string())],
                Some(RETURN_REPRESENTATION),
            )?
            .json(&environment_insert_from_new(environment));

        let rows: Vec<EnvironmentIdDto> = self.send_for_rows(request_ctx, ctx, request).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| invalid_response("insert returned no row", ctx))?;
        EnvironmentId::parse(&row.id)
            .map_err(|_| invalid_response("insert returned an empty id", ctx))
    }

    async fn insert_variable_rows(
        &self,
        request_ctx: &RequestContext,
        environment_id: &EnvironmentId,
        variables: &[EnvironmentVariable],
    ) -> Result<()> {
        if variables.is_empty() {
            return Ok(());
        }
        let ctx = StoreErrorContext {
            operation: "postgrest.insert_variables",
            table: &self.variables_table,
        };
        let request = self
            .request(Method::POST, ctx, &[], Some(RETURN_MINIMAL))?
            .json(&variable_inserts(environment_id, variables));
        self.send(request_ctx, ctx, request).await.map(|_| ())
    }

    async fn update_one(
        &self,
        request_ctx: &RequestContext,
        id: &EnvironmentId,
        patch: &EnvironmentPatch,
    ) -> Result<EnvironmentRecord> {
        let ctx = self.environments("postgrest.update_environment");
        let request = self
            .request(
                Method::PATCH,
                ctx,
                &[("id", eq_filter(id)), ("select", "*".to_string())],
                Some(RETURN_REPRESENTATION),
            )?
            .json(&patch_body(patch));

        let rows: Vec<EnvironmentRowDto> = self.send_for_rows(request_ctx, ctx, request).await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            ErrorEnvelope::expected(ErrorCode::store_not_found(), "Environment not found")
                .with_metadata("operation", ctx.operation)
                .with_metadata("environment_id", id.as_str())
        })?;
        record_from_row(row)
    }

    async fn update_many(
        &self,
        request_ctx: &RequestContext,
        ids: &[EnvironmentId],
        patch: &EnvironmentPatch,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ctx = self.environments("postgrest.update_environments");
        let request = self
            .request(
                Method::PATCH,
                ctx,
                &[("id", in_filter(ids))],
                Some(RETURN_MINIMAL),
            )?
            .json(&patch_body(patch));
        self.send(request_ctx, ctx, request).await.map(|_| ())
    }

    async fn delete_where(
        &self,
        request_ctx: &RequestContext,
        operation: &'static str,
        filter: String,
    ) -> Result<()> {
        let ctx = self.environments(operation);
        let request = self.request(Method::DELETE, ctx, &[("id", filter)], Some(RETURN_MINIMAL))?;
        self.send(request_ctx, ctx, request).await.map(|_| ())
    }

    async fn select_rows(
        &self,
        request_ctx: &RequestContext,
        operation: &'static str,
        filters: &[(&str, String)],
    ) -> Result<Vec<EnvironmentRecord>> {
        let ctx = self.environments(operation);
        let request = self.request(Method::GET, ctx, filters, None)?;
        let rows: Vec<EnvironmentRowDto> = self.send_for_rows(request_ctx, ctx, request).await?;
        rows.into_iter().map(record_from_row).collect()
    }
}

impl EnvironmentStorePort for PostgrestEnvironmentStore {
    fn insert_environment(
        &self,
        ctx: &RequestContext,
        environment: NewEnvironment,
    ) -> BoxFuture<'_, Result<EnvironmentId>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.insert_environment_row(&ctx, &environment).await })
    }

    fn insert_variables(
        &self,
        ctx: &RequestContext,
        environment_id: EnvironmentId,
        variables: Vec<EnvironmentVariable>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.insert_variable_rows(&ctx, &environment_id, &variables)
                .await
        })
    }

    fn update_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<EnvironmentRecord>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.update_one(&ctx, &id, &patch).await })
    }

    fn update_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
        patch: EnvironmentPatch,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.update_many(&ctx, &ids, &patch).await })
    }

    fn delete_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.delete_where(&ctx, "postgrest.delete_environment", eq_filter(&id))
                .await
        })
    }

    fn delete_environments(
        &self,
        ctx: &RequestContext,
        ids: Vec<EnvironmentId>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            self.delete_where(&ctx, "postgrest.delete_environments", in_filter(&ids))
                .await
        })
    }

    fn get_environment(
        &self,
        ctx: &RequestContext,
        id: EnvironmentId,
    ) -> BoxFuture<'_, Result<Option<EnvironmentRecord>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let rows = self
                .select_rows(
                    &ctx,
                    "postgrest.get_environment",
                    &[("id", eq_filter(&id)), ("select", "*".to_string())],
                )
                .await?;
            Ok(rows.into_iter().next())
        })
    }

    fn list_environments(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<EnvironmentRecord>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.select_rows(
                &ctx,
                "postgrest.list_environments",
                &[
                    ("select", "*".to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await
        })
    }
}

/// Normalize a project URL into the REST root (`.../rest/v1/`).
fn to_rest_root(address: &str) -> Result<Url> {
    let trimmed = address.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    let root = if with_scheme.ends_with("/rest/v1") {
        format!("{with_scheme}/")
    } else {
        format!("{with_scheme}/rest/v1/")
    };
    Url::parse(&root).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            format!("invalid store base URL: {error}"),
        )
    })
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "store credentials contain invalid header characters",
        )
    })?;
    header.set_sensitive(true);
    Ok(header)
}

fn eq_filter(id: &EnvironmentId) -> String {
    format!("eq.{}", id.as_str())
}

/// `in.("a","b")` with PostgREST quoting, so ids containing `,` or `)` stay intact.
fn in_filter(ids: &[EnvironmentId]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| {
            let escaped = id.as_str().replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        })
        .collect();
    format!("in.({})", quoted.join(","))
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> Result<EnvironmentId> {
        EnvironmentId::parse(value).map_err(ErrorEnvelope::from)
    }

    #[test]
    fn rest_root_is_normalized() -> Result<()> {
        assert_eq!(
            to_rest_root("https://p.supabase.co/")?.as_str(),
            "https://p.supabase.co/rest/v1/"
        );
        assert_eq!(
            to_rest_root("http://localhost:54321/rest/v1")?.as_str(),
            "http://localhost:54321/rest/v1/"
        );
        assert_eq!(
            to_rest_root("p.supabase.co")?.as_str(),
            "https://p.supabase.co/rest/v1/"
        );
        Ok(())
    }

    #[test]
    fn in_filter_quotes_ids() -> Result<()> {
        let ids = [id("a1")?, id("b,2")?, id("c\"3")?];
        assert_eq!(in_filter(&ids), r#"in.("a1","b,2","c\"3")"#);
        Ok(())
    }

    #[test]
    fn config_requires_anon_key() {
        let config = PostgrestStoreConfig {
            base_url: "https://p.supabase.co".into(),
            anon_key: SecretString::from(" "),
            access_token: None,
            schema: "codex_open".into(),
            environments_table: "environments".into(),
            variables_table: "environment_variables".into(),
            timeout_ms: 1_000,
        };
        let error = PostgrestEnvironmentStore::new(config).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::invalid_input())
        );
    }
}
