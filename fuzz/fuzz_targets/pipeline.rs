#![no_main]

use bytescope::{
    analysis::AnalysisConfig,
    assembly::{Condition, MethodAssembler, MethodIdentifier, Operation, SwitchKind, ValueKind},
};
use libfuzzer_sys::fuzz_target;

fn build(data: &[u8]) -> bytescope::Result<()> {
    let Some((&count, ops)) = data.split_first() else {
        return Ok(());
    };
    let count = usize::from(count % 64) + 1;
    let label = |byte: u8| format!("L{}", usize::from(byte) % count);

    let method = MethodIdentifier::new("fuzz/Target", "run", "(I)V")?;
    let mut asm = MethodAssembler::new(method);
    let mut bytes = ops.iter().copied();

    for index in 0..count {
        asm.define_label(&format!("L{index}"))?;
        let arg = bytes.next().unwrap_or(0);
        match bytes.next().unwrap_or(0) % 7 {
            0 => asm.emit(Operation::Nop)?,
            1 => asm.branch(Condition::Equal, &label(arg))?,
            2 => asm.goto(&label(arg))?,
            3 => asm.emit(Operation::Throw)?,
            4 => {
                let first = label(arg.wrapping_add(1));
                let second = label(arg.wrapping_add(2));
                asm.switch(
                    SwitchKind::Table,
                    &label(arg),
                    &[(0, first.as_str()), (1, second.as_str())],
                )?
            }
            5 => asm.emit(Operation::Load { kind: ValueKind::Int, slot: 0 })?,
            _ => asm.emit(Operation::Return(None))?,
        };
    }
    asm.emit(Operation::Return(None))?;

    if let (Some(start), Some(end), Some(handler)) = (bytes.next(), bytes.next(), bytes.next()) {
        asm.try_catch(&label(start.min(end)), &label(start.max(end)), &label(handler), None)?;
    }

    let body = asm.finish()?;
    let cfg = body.analyze(&AnalysisConfig::permissive())?;
    let cdg = cfg.cdg()?;
    let frames = cfg.stack_frames(Some(body.variables()));
    for instruction in body.instructions() {
        cdg.control_dependencies(instruction, true)?;
        cfg.pdt()?.post_dominators(instruction)?;
        let _ = cfg.type_of_top_at(instruction, Some(body.variables()));
        if let Ok(frames) = &frames {
            frames.input(instruction)?;
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let _ = build(data);
});
