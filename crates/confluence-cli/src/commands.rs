//! Command dispatch for the `confluence` binary.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use confluence_core::callback::{self, CallbackOutcome, Url};
use confluence_core::models::{DocumentCreateRequest, DocumentUpdateRequest};
use confluence_core::navigation::routes;
use confluence_core::{AppContext, ApiError};
use futures::stream::{self, StreamExt};
use serde_json::Value;

/// Maximum concurrent document fetches for `docs get`.
const MAX_CONCURRENT_REQUESTS: usize = 4;

pub const USAGE: &str = "\
Usage: confluence <command>

Commands:
  login                         Print the sign-in URL
  callback <url>                Finish sign-in from the redirect URL
  auth-error <url>              Explain a failed sign-in redirect
  whoami                        Show the signed-in user
  logout                        Sign out
  docs list [key=value ...]     List documents, filtered by query parameters
  docs get <id> [<id> ...]      Show one or more documents
  docs create <space> <title> [content]
  docs rename <id> <title>
  docs archive <id>
  docs delete <id>";

pub async fn run(ctx: &AppContext, args: &[String]) -> Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["login"] => {
            let url = callback::login_url(&ctx.config.api_base_url)?;
            println!("Open this URL in your browser to sign in:\n  {}", url);
            println!("Then run `confluence callback <redirect url>`.");
            Ok(())
        }
        ["callback", url] => finish_login(ctx, url).await,
        ["auth-error", url] => {
            let url = parse_url(url)?;
            println!("Authentication Error: {}", callback::auth_error_message(&url));
            println!("Try again with `confluence login`.");
            Ok(())
        }
        ["whoami"] => {
            match ctx.sessions.current_user() {
                Some(user) => {
                    println!("{}", user.display_name.as_deref().unwrap_or(&user.email));
                    println!("  id:      {}", user.subject);
                    println!("  email:   {}", user.email);
                    println!("  expires: in {} min", user.minutes_until_expiry());
                }
                None => println!("Not signed in."),
            }
            Ok(())
        }
        ["logout"] => {
            ctx.sessions.logout()?;
            println!("Signed out.");
            Ok(())
        }
        ["docs", rest @ ..] => documents(ctx, rest).await,
        _ => bail!("{}", USAGE),
    }
}

/// Which sign-in route a redirect URL landed on, if any.
fn redirect_route(url: &Url) -> Option<&'static str> {
    let path = url.path().trim_end_matches('/');
    [routes::AUTH_CALLBACK, routes::AUTH_ERROR]
        .into_iter()
        .find(|route| path.ends_with(route))
}

async fn finish_login(ctx: &AppContext, url: &str) -> Result<()> {
    let url = parse_url(url)?;
    match redirect_route(&url) {
        Some(routes::AUTH_ERROR) => bail!(
            "Authentication Error: {} Try again with `confluence login`.",
            callback::auth_error_message(&url)
        ),
        Some(_) => {}
        None => tracing::warn!(path = url.path(), "Unexpected sign-in redirect path"),
    }

    println!("Processing your login...");
    match ctx.auth_callback().process(&url).await {
        CallbackOutcome::Authenticated { .. } => {
            println!("{}", callback::SUCCESS_MESSAGE);
            Ok(())
        }
        CallbackOutcome::Failed {
            message,
            retry_route,
        } => {
            let hint = if retry_route == routes::LOGIN {
                "Return to login with `confluence login`."
            } else {
                ""
            };
            Err(anyhow!("{} {}", message, hint))
        }
    }
}

async fn documents(ctx: &AppContext, args: &[&str]) -> Result<()> {
    let docs = &ctx.documents;
    match args {
        ["list", filters @ ..] => {
            let filters = parse_filters(filters)?;
            let list = docs.list(&filters).await?;
            println!("{} of {} documents", list.documents.len(), list.total);
            for doc in &list.documents {
                let archived = if doc.is_archived { " (archived)" } else { "" };
                println!("  {}  {}{}", doc.id, doc.title, archived);
            }
        }
        ["get", ids @ ..] if !ids.is_empty() => {
            let results: Vec<(String, Result<Value, ApiError>)> = stream::iter(ids.iter())
                .map(|id| async move {
                    let result = docs
                        .get(id)
                        .await
                        .and_then(|doc| serde_json::to_value(doc).map_err(decode_error));
                    (id.to_string(), result)
                })
                .buffered(MAX_CONCURRENT_REQUESTS)
                .collect()
                .await;

            let mut failed = 0;
            for (id, result) in results {
                match result {
                    Ok(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                    Err(e) => {
                        failed += 1;
                        tracing::debug!(id = %id, error = %e, "Fetch failed");
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} documents could not be loaded", failed, ids.len());
            }
        }
        ["create", space, title, content @ ..] => {
            let request = DocumentCreateRequest {
                title: title.to_string(),
                content: content.join(" "),
                space_id: space.to_string(),
                ..Default::default()
            };
            let doc = docs.create(&request).await?;
            println!("Created {}", doc.id);
        }
        ["rename", id, title] => {
            let request = DocumentUpdateRequest {
                title: Some(title.to_string()),
                ..Default::default()
            };
            let doc = docs.update(id, &request).await?;
            println!("Renamed {} to {}", doc.id, doc.title);
        }
        ["archive", id] => {
            let request = DocumentUpdateRequest {
                is_archived: Some(true),
                ..Default::default()
            };
            docs.update(id, &request).await?;
            println!("Archived {}", id);
        }
        ["delete", id] => {
            docs.delete(id).await?;
            println!("Deleted {}", id);
        }
        _ => bail!("{}", USAGE),
    }
    Ok(())
}

fn decode_error(e: serde_json::Error) -> ApiError {
    ApiError::Unknown {
        status: None,
        message: e.to_string(),
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid URL: {}", raw))
}

fn parse_filters(args: &[&str]) -> Result<BTreeMap<String, String>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Expected key=value filter, got `{}`", arg))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&["spaceId=s1", "tag=a=b"]).unwrap();
        assert_eq!(filters.get("spaceId").map(String::as_str), Some("s1"));
        assert_eq!(filters.get("tag").map(String::as_str), Some("a=b"));

        assert!(parse_filters(&["novalue"]).is_err());
        assert!(parse_filters(&["=x"]).is_err());
    }

    #[test]
    fn test_redirect_route() {
        let callback = parse_url("http://localhost:3000/auth/callback?token=abc").unwrap();
        assert_eq!(redirect_route(&callback), Some(routes::AUTH_CALLBACK));

        let error = parse_url("http://localhost:3000/app/auth/error/?message=denied").unwrap();
        assert_eq!(redirect_route(&error), Some(routes::AUTH_ERROR));

        let other = parse_url("http://localhost:3000/documents").unwrap();
        assert_eq!(redirect_route(&other), None);
    }
}
