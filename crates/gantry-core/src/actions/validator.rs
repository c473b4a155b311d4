//! Validator - handler を呼ぶ前の引数個数チェック
//!
//! action に依らず共通。handler 側は個数が満たされている前提で書ける。

use crate::domain::{ActionError, Message};

pub fn validate(message: &Message, min_args: usize) -> Result<(), ActionError> {
    if message.args.len() < min_args {
        return Err(ActionError::InsufficientArguments {
            action: message.action.clone(),
            min_args,
        });
    }
    Ok(())
}
