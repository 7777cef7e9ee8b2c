//! Lowering of execution plans to Cranelift IR
//!
//! The generated function has the signature
//! `unsafe extern "C" fn(src: *const Block, dst: *mut Block)` and evaluates
//! one group: it reads `source_block_count` blocks from `src` and writes one
//! block to `dst`. Cranelift has no 256-bit integer vector type, so each
//! block is carried as two `i64x2` halves.

use crate::plan::{Block, ExecutionPlan, Op, BLOCK_SIZE};
use anyhow::{anyhow, Context};
use cranelift_codegen::ir::{types, AbiParam, InstBuilder, MemFlags, Value};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::verifier::verify_function;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};

/// Native entry point of a compiled plan
pub(super) type KernelFn = unsafe extern "C" fn(*const Block, *mut Block);

/// Byte offset of the upper half of a block
const HALF: i32 = (BLOCK_SIZE / 2) as i32;

/// Finalized machine code together with the module that owns it
pub(super) struct CompiledKernel {
    pub module: JITModule,
    pub func: KernelFn,
}

/// Compile `plan` for the host
///
/// With `infer_native_flags` the ISA enables every extension the host
/// reports; without it code is generated for the baseline target.
pub(super) fn compile(plan: &ExecutionPlan, infer_native_flags: bool) -> anyhow::Result<CompiledKernel> {
    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", "speed")
        .map_err(|e| anyhow!("setting opt_level: {e}"))?;
    flag_builder
        .set("use_colocated_libcalls", "false")
        .map_err(|e| anyhow!("setting use_colocated_libcalls: {e}"))?;

    let isa = cranelift_native::builder_with_options(infer_native_flags)
        .map_err(|msg| anyhow!("host is not supported by Cranelift: {msg}"))?
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| anyhow!("building target ISA: {e}"))?;

    let builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
    let mut module = JITModule::new(builder);
    let mut ctx = module.make_context();
    let mut func_ctx = FunctionBuilderContext::new();

    let ptr_type = module.target_config().pointer_type();
    ctx.func.signature.params.push(AbiParam::new(ptr_type)); // src
    ctx.func.signature.params.push(AbiParam::new(ptr_type)); // dst

    let func_id = module
        .declare_function("sample_group", Linkage::Export, &ctx.func.signature)
        .map_err(|e| anyhow!("{e}"))
        .context("declaring kernel")?;

    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut func_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);

        let params = builder.block_params(entry);
        let (src, dst) = (params[0], params[1]);
        lower_plan(&mut builder, plan, src, dst);

        builder.ins().return_(&[]);
        builder.seal_all_blocks();
        builder.finalize();
    }

    verify_function(&ctx.func, module.isa())
        .map_err(|errors| anyhow!("{errors}"))
        .context("verifying kernel IR")?;

    module
        .define_function(func_id, &mut ctx)
        .map_err(|e| anyhow!("{e:?}"))
        .context("defining kernel")?;
    module.clear_context(&mut ctx);
    module
        .finalize_definitions()
        .map_err(|e| anyhow!("{e}"))
        .context("finalizing kernel")?;

    let code = module.get_finalized_function(func_id);
    // Safety: the function was declared with two pointer parameters and no
    // return value, matching `KernelFn` under the host's default call conv.
    let func = unsafe { std::mem::transmute::<*const u8, KernelFn>(code) };

    Ok(CompiledKernel { module, func })
}

/// Emit the straight-line body for one group
fn lower_plan(builder: &mut FunctionBuilder, plan: &ExecutionPlan, src: Value, dst: Value) {
    // Callers pass in-bounds, 32-byte aligned blocks.
    let flags = MemFlags::trusted();
    let load = |builder: &mut FunctionBuilder, index: usize| -> (Value, Value) {
        let offset = (index * BLOCK_SIZE) as i32;
        let lo = builder.ins().load(types::I64X2, flags, src, offset);
        let hi = builder.ins().load(types::I64X2, flags, src, offset + HALF);
        (lo, hi)
    };

    let mut consumed = 0;
    let mut acc = load(builder, consumed);
    for op in plan.operations() {
        acc = match op {
            Op::Not => (builder.ins().bnot(acc.0), builder.ins().bnot(acc.1)),
            Op::And => {
                consumed += 1;
                let rhs = load(builder, consumed);
                (builder.ins().band(acc.0, rhs.0), builder.ins().band(acc.1, rhs.1))
            }
            Op::Or => {
                consumed += 1;
                let rhs = load(builder, consumed);
                (builder.ins().bor(acc.0, rhs.0), builder.ins().bor(acc.1, rhs.1))
            }
        };
    }

    builder.ins().store(flags, acc.0, dst, 0);
    builder.ins().store(flags, acc.1, dst, HALF);
}
