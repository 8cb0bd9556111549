//! Example agents used throughout the tests.
//!
//! - **Aliases** lets an account delegate to an alias address.
//! - **Townhall** hosts discussions and votes, resolving voters through
//!   the Aliases namespace.

use async_trait::async_trait;
use highlight::{Agent, AgentRegistry, Call, Context, Handler, HighlightError, Result};
use highlight_core::{TypedDataField, Types};
use serde_json::{json, Map, Value};

/// Contract address of the Aliases agent.
pub const ALIASES_ADDRESS: &str = "0x0000000000000000000000000000000000000001";
/// Namespace of the Aliases agent.
pub const ALIASES_ID: &str = "aliases";

/// Contract address of the Townhall agent.
pub const TOWNHALL_ADDRESS: &str = "0x0000000000000000000000000000000000000002";
/// Namespace of the Townhall agent.
pub const TOWNHALL_ID: &str = "townhall";

fn schema(name: &str, fields: &[(&str, &str)]) -> Types {
    let mut types = Types::new();
    types.insert(
        name.to_string(),
        fields
            .iter()
            .map(|(n, k)| TypedDataField::new(*n, *k))
            .collect(),
    );
    types
}

fn string_field<'m>(message: &'m Map<String, Value>, name: &str) -> Result<&'m str> {
    message
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| HighlightError::InvalidMessage(format!("missing {name}")))
}

fn u64_field(message: &Map<String, Value>, name: &str) -> Result<u64> {
    let value = match message.get(name) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    value.ok_or_else(|| HighlightError::InvalidMessage(format!("missing {name}")))
}

fn salt(call: &Call<'_>) -> Value {
    call.domain
        .salt
        .as_ref()
        .map(|s| s.to_value())
        .unwrap_or(Value::Null)
}

// ─────────────────────────────────────────────────────────────────────────────
// Aliases
// ─────────────────────────────────────────────────────────────────────────────

/// `SetAlias(address from,address alias)`.
pub fn set_alias_types() -> Types {
    schema("SetAlias", &[("from", "address"), ("alias", "address")])
}

struct SetAlias;

#[async_trait]
impl Handler for SetAlias {
    async fn handle(
        &self,
        ctx: &mut Context<'_>,
        message: &Map<String, Value>,
        call: &Call<'_>,
    ) -> Result<()> {
        let from = string_field(message, "from")?.to_lowercase();
        let alias = string_field(message, "alias")?.to_lowercase();

        ctx.assert(from == call.signer.to_lowercase(), "Invalid signer")?;
        let taken = ctx.has(&alias).await?;
        ctx.assert(!taken, "Alias already exists")?;

        ctx.write(&alias, json!(from));
        ctx.emit("setAlias", vec![json!(from), json!(alias), salt(call)]);
        Ok(())
    }
}

/// A fresh Aliases agent.
pub fn aliases() -> Result<Agent> {
    Agent::new(ALIASES_ID).with_entrypoint(set_alias_types(), SetAlias)
}

// ─────────────────────────────────────────────────────────────────────────────
// Townhall
// ─────────────────────────────────────────────────────────────────────────────

/// `CreateDiscussion(address author,string title,string body)`.
pub fn create_discussion_types() -> Types {
    schema(
        "CreateDiscussion",
        &[("author", "address"), ("title", "string"), ("body", "string")],
    )
}

/// `Vote(address voter,uint256 discussion,uint8 choice)`.
pub fn vote_types() -> Types {
    schema(
        "Vote",
        &[("voter", "address"), ("discussion", "uint256"), ("choice", "uint8")],
    )
}

const DISCUSSION_COUNT: &str = "discussions";

/// The account a signer acts for: the owner if the signer is a registered
/// alias, otherwise the signer itself.
async fn acting_account(ctx: &mut Context<'_>, signer: &str) -> Result<String> {
    let signer = signer.to_lowercase();
    Ok(match ctx.get_from(ALIASES_ID, &signer).await? {
        Some(Value::String(owner)) => owner,
        _ => signer,
    })
}

struct CreateDiscussion;

#[async_trait]
impl Handler for CreateDiscussion {
    async fn handle(
        &self,
        ctx: &mut Context<'_>,
        message: &Map<String, Value>,
        call: &Call<'_>,
    ) -> Result<()> {
        let author = string_field(message, "author")?.to_lowercase();
        let title = string_field(message, "title")?;
        ctx.assert(!title.is_empty(), "Title is required")?;

        let account = acting_account(ctx, call.signer).await?;
        ctx.assert(author == account, "Invalid signer")?;

        let id = ctx
            .get(DISCUSSION_COUNT)
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
            + 1;
        ctx.write(DISCUSSION_COUNT, json!(id));
        ctx.write(
            &format!("discussion:{id}"),
            json!({ "author": author, "title": title, "body": message.get("body") }),
        );

        // Read back the staged record so the event mirrors storage.
        let stored = ctx.get(&format!("discussion:{id}")).await?;
        ctx.emit(
            "createDiscussion",
            vec![json!(id), json!(author), stored.unwrap_or(Value::Null)],
        );
        Ok(())
    }
}

struct Vote;

#[async_trait]
impl Handler for Vote {
    async fn handle(
        &self,
        ctx: &mut Context<'_>,
        message: &Map<String, Value>,
        call: &Call<'_>,
    ) -> Result<()> {
        let voter = string_field(message, "voter")?.to_lowercase();
        let discussion = u64_field(message, "discussion")?;
        let choice = u64_field(message, "choice")?;

        let account = acting_account(ctx, call.signer).await?;
        ctx.assert(voter == account, "Invalid signer")?;
        let exists = ctx.has(&format!("discussion:{discussion}")).await?;
        ctx.assert(exists, "Discussion not found")?;

        let ballot = format!("vote:{discussion}:{voter}");
        let voted = ctx.has(&ballot).await?;
        ctx.assert(!voted, "Already voted")?;

        ctx.write(&ballot, json!(choice));
        ctx.emit("vote", vec![json!(discussion), json!(voter), json!(choice)]);
        Ok(())
    }
}

/// A fresh Townhall agent.
pub fn townhall() -> Result<Agent> {
    Agent::new(TOWNHALL_ID)
        .with_entrypoint(create_discussion_types(), CreateDiscussion)?
        .with_entrypoint(vote_types(), Vote)
}

/// A registry with Aliases and Townhall at their well-known addresses.
pub fn registry() -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    registry
        .register(ALIASES_ADDRESS, aliases)
        .register(TOWNHALL_ADDRESS, townhall);
    registry
}
