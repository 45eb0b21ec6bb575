pub mod assemble;
pub mod auto_wire;
pub mod generate;
pub mod register;
pub mod validate;

pub use assemble::AssemblePhase;
pub use auto_wire::AutoWirePhase;
pub use generate::GeneratePhase;
pub use register::RegisterServicesPhase;
pub use validate::ValidatePhase;
