use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use solana_system_interface::instruction::transfer;

/// Associated token account of `owner` for `mint` under the classic token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

pub fn create_ata_idempotent(funding: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account_idempotent(
        funding,
        owner,
        mint,
        &spl_token::id(),
    )
}

/// Moves `amount` lamports into a wrapped SOL token account and syncs its
/// token balance.
pub fn wrap_sol_instructions(
    from: &Pubkey,
    to: &Pubkey,
    amount: u64,
) -> anyhow::Result<Vec<Instruction>> {
    Ok(vec![
        transfer(from, to, amount),
        spl_token::instruction::sync_native(&spl_token::id(), to)?,
    ])
}

/// Closing a wrapped SOL account unwraps its balance into `destination`.
pub fn close_spl_account(
    close_account: &Pubkey,
    destination: &Pubkey,
    close_authority: &Pubkey,
) -> anyhow::Result<Instruction> {
    Ok(spl_token::instruction::close_account(
        &spl_token::id(),
        close_account,
        destination,
        close_authority,
        &[],
    )?)
}
