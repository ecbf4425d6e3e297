//! Transport-level requests and their dispatch onto an `AccountManager`.

use crate::response::{Response, StatusCode};
use accountdir_core::{
    hello, AccountId, AccountInput, AccountManager, AccountStore, ListWindow, ManagerResult,
};
use clap::Args;
use log::debug;
use serde::{Deserialize, Serialize};

/// Writable account fields as they arrive from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Args, Deserialize)]
pub struct AccountFields {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

impl AccountFields {
    fn into_input(self) -> AccountInput {
        AccountInput::new(self.username, self.email, self.password)
    }
}

/// One directory request.
///
/// Batch lines are JSON objects tagged by `op`, e.g.
/// `{"op": "get", "id": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Hello,
    Create(AccountFields),
    Get {
        id: AccountId,
    },
    List {
        #[serde(default)]
        limit: Option<i64>,
        #[serde(default)]
        offset: Option<i64>,
    },
    Update {
        id: AccountId,
        #[serde(flatten)]
        fields: AccountFields,
    },
    Delete {
        id: AccountId,
    },
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Create(_) => "create",
            Self::Get { .. } => "get",
            Self::List { .. } => "list",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Validates `request`, runs it against `manager` and shapes the answer.
pub fn dispatch<S: AccountStore>(manager: &AccountManager<S>, request: Request) -> Response {
    let name = request.name();
    let response = match request {
        Request::Hello => Response::success(StatusCode::Ok, &hello()),
        Request::Create(fields) => {
            let input = fields.into_input();
            match input.validate() {
                Ok(()) => respond(StatusCode::Created, manager.create_account(&input)),
                Err(err) => Response::detail(StatusCode::UnprocessableEntity, err.to_string()),
            }
        }
        Request::Get { id } => respond(StatusCode::Ok, manager.get_account(id)),
        Request::List { limit, offset } => match ListWindow::from_signed(limit, offset) {
            Ok(window) => respond(StatusCode::Ok, manager.list_accounts(window)),
            Err(err) => Response::detail(StatusCode::UnprocessableEntity, err.to_string()),
        },
        Request::Update { id, fields } => {
            let input = fields.into_input();
            match input.validate() {
                Ok(()) => respond(StatusCode::Ok, manager.update_account(id, &input)),
                Err(err) => Response::detail(StatusCode::UnprocessableEntity, err.to_string()),
            }
        }
        Request::Delete { id } => respond(StatusCode::Ok, manager.delete_account(id)),
    };

    debug!(
        "event=request module=cli op={name} status={}",
        response.status
    );
    response
}

fn respond<T: Serialize>(status: StatusCode, result: ManagerResult<T>) -> Response {
    match result {
        Ok(body) => Response::success(status, &body),
        Err(err) => Response::from_manager_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch, AccountFields, Request};
    use accountdir_core::{AccountManager, MemoryAccountStore};
    use serde_json::json;

    fn manager() -> AccountManager<MemoryAccountStore> {
        AccountManager::new(MemoryAccountStore::new())
    }

    fn fields(username: &str, email: &str, password: &str) -> AccountFields {
        AccountFields {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn create(username: &str, email: &str) -> Request {
        Request::Create(fields(username, email, "secret"))
    }

    #[test]
    fn hello_answers_greeting() {
        let response = dispatch(&manager(), Request::Hello);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"message": "Hello World"}));
    }

    #[test]
    fn create_answers_created_without_password() {
        let response = dispatch(&manager(), create("John", "john@example.com"));

        assert_eq!(response.status, 201);
        assert_eq!(
            response.body,
            json!({"id": 1, "username": "John", "email": "john@example.com"})
        );
    }

    #[test]
    fn create_conflicts_name_the_field() {
        let manager = manager();
        dispatch(&manager, create("john.doe", "john.doe@example.com"));

        let email = dispatch(&manager, create("John", "john.doe@example.com"));
        assert_eq!(email.status, 409);
        assert_eq!(email.body, json!({"detail": "Email already exists"}));

        let username = dispatch(&manager, create("john.doe", "john@example.com"));
        assert_eq!(username.status, 409);
        assert_eq!(username.body, json!({"detail": "Username already exists"}));
    }

    #[test]
    fn update_conflict_answers_combined_detail() {
        let manager = manager();
        dispatch(&manager, create("john.doe", "john.doe@example.com"));
        dispatch(&manager, create("jane.doe", "jane.doe@example.com"));

        let response = dispatch(
            &manager,
            Request::Update {
                id: 1,
                fields: fields("jane.doe", "john.doe@example.com", "new_secret"),
            },
        );

        assert_eq!(response.status, 409);
        assert_eq!(
            response.body,
            json!({"detail": "Username or Email already exists"})
        );
    }

    #[test]
    fn missing_accounts_answer_not_found() {
        let manager = manager();
        let requests = [
            Request::Get { id: 999 },
            Request::Update {
                id: -1,
                fields: fields("John Doe", "john.doe@example.com", "new_secret"),
            },
            Request::Delete { id: 999 },
        ];

        for request in requests {
            let response = dispatch(&manager, request);
            assert_eq!(response.status, 404);
            assert_eq!(response.body, json!({"detail": "Account not found"}));
        }
    }

    #[test]
    fn list_and_delete_follow_wire_shapes() {
        let manager = manager();
        assert_eq!(
            dispatch(&manager, Request::List { limit: None, offset: None }).body,
            json!({"accounts": []})
        );

        dispatch(&manager, create("john.doe", "john.doe@example.com"));
        let deleted = dispatch(&manager, Request::Delete { id: 1 });
        assert_eq!(deleted.status, 200);
        assert_eq!(
            deleted.body,
            json!({"message": "Account deleted successfully"})
        );
    }

    #[test]
    fn invalid_input_is_rejected_before_the_manager() {
        let manager = manager();

        let bad_email = dispatch(&manager, create("John", "not-an-email"));
        assert_eq!(bad_email.status, 422);

        let bad_window = dispatch(
            &manager,
            Request::List {
                limit: Some(-1),
                offset: None,
            },
        );
        assert_eq!(bad_window.status, 422);

        let listed = dispatch(&manager, Request::List { limit: None, offset: None });
        assert_eq!(listed.body, json!({"accounts": []}));
    }

    #[test]
    fn batch_lines_deserialize_by_op_tag() {
        let update: Request = serde_json::from_str(
            r#"{"op": "update", "id": 1, "username": "a", "email": "a@example.com", "password": "x"}"#,
        )
        .unwrap();
        assert_eq!(
            update,
            Request::Update {
                id: 1,
                fields: fields("a", "a@example.com", "x"),
            }
        );

        let list: Request = serde_json::from_str(r#"{"op": "list", "limit": 5}"#).unwrap();
        assert_eq!(
            list,
            Request::List {
                limit: Some(5),
                offset: None
            }
        );
    }
}
