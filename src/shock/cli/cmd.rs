//! Admin CLI command definitions and dispatch. Shock is single-node, so
//! these subcommands open the same on-disk store the server uses and call
//! straight into `shock_model` — no RPC hop required.

use structopt::StructOpt;

use format_table::format_table;
use shock_model::{Error, NodeStore};
use shock_util::data::Uuid;

#[derive(StructOpt, Debug)]
pub enum UserOperation {
	/// List known users
	List,
	/// Mint a user record directly, bypassing the HTTP authentication flow
	Create { username: String },
	/// Show one user's public fields (username or hex uuid)
	Show { username_or_uuid: String },
}

#[derive(StructOpt, Debug)]
pub enum NodeOperation {
	/// Print a node's metadata document
	Show { id: String },
	/// Delete a node and its on-disk directory
	Delete { id: String },
}

fn parse_id(raw: &str) -> Result<Uuid, Error> {
	Uuid::from_hex(raw).ok_or(Error::NotFound)
}

pub fn cmd_user(store: &NodeStore, op: UserOperation) -> Result<(), Error> {
	match op {
		UserOperation::List => {
			let mut rows = vec!["UUID\tUsername\tAdmin".to_string()];
			for user in store.all_users()? {
				rows.push(format!("{}\t{}\t{}", user.uuid, user.username, user.admin));
			}
			format_table(rows);
			Ok(())
		}
		UserOperation::Create { username } => {
			let user = store.user_for_username(&username)?;
			println!("created user {} ({})", user.username, user.uuid);
			Ok(())
		}
		UserOperation::Show { username_or_uuid } => {
			let by_uuid = Uuid::from_hex(&username_or_uuid)
				.map(|id| store.find_user_by_uuid(&id))
				.transpose()?
				.flatten();
			let user = match by_uuid {
				Some(u) => Some(u),
				None => store.find_user_by_username(&username_or_uuid)?,
			};
			match user {
				Some(u) => println!("{}", u.to_public_json()),
				None => println!("no such user"),
			}
			Ok(())
		}
	}
}

pub fn cmd_node(store: &NodeStore, op: NodeOperation) -> Result<(), Error> {
	match op {
		NodeOperation::Show { id } => {
			let id = parse_id(&id)?;
			match store.find_by_id(&id)? {
				Some(node) => println!(
					"{}",
					serde_json::to_string_pretty(&node).expect("node always serializes to JSON")
				),
				None => println!("no such node"),
			}
			Ok(())
		}
		NodeOperation::Delete { id } => {
			let id = parse_id(&id)?;
			let node = store.find_by_id(&id)?.ok_or(Error::NotFound)?;
			store.delete(&node)?;
			println!("deleted {}", id);
			Ok(())
		}
	}
}
