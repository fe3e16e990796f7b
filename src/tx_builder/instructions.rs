//! Instruction helpers
//!
//! The only directive this crate builds itself is a system-program transfer.
//! Anything else arrives pre-built and is only sanity checked.

#[allow(deprecated)]
use solana_sdk::system_instruction;
use solana_sdk::{instruction::Instruction, native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

use super::errors::{FlowError, FlowResult};

/// Transfer `lamports` from `from` to `to` through the system program
pub fn transfer_instruction(from: &Pubkey, to: &Pubkey, lamports: u64) -> FlowResult<Instruction> {
    if lamports == 0 {
        return Err(FlowError::invalid_input("transfer amount must be non-zero"));
    }
    if *to == Pubkey::default() {
        return Err(FlowError::invalid_input("destination is the default address"));
    }
    #[allow(deprecated)]
    let instruction = system_instruction::transfer(from, to, lamports);
    Ok(instruction)
}

/// Reject instructions that cannot mean anything: no accounts and no data
/// addressed to the default program id.
pub fn validate_instruction(instruction: &Instruction) -> FlowResult<()> {
    if instruction.program_id == Pubkey::default()
        && instruction.accounts.is_empty()
        && instruction.data.is_empty()
    {
        return Err(FlowError::invalid_input("instruction is empty"));
    }
    Ok(())
}

/// Render lamports as SOL with full precision
pub fn format_sol(lamports: u64) -> String {
    format!(
        "{}.{:09}",
        lamports / LAMPORTS_PER_SOL,
        lamports % LAMPORTS_PER_SOL
    )
}
