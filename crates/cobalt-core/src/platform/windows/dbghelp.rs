//! # dbghelp Symbol Provider
//!
//! [`SymbolProvider`] and [`TypeInfoSource`] backed by `dbghelp.dll`, plus the
//! `StackWalk64` based [`StackWalker`].
//!
//! dbghelp keys its per-process state by the process handle passed to
//! `SymInitializeW`, so the provider opens and keeps its own handle for the
//! whole symbol session. Every later call goes through that same handle.
//!
//! dbghelp is single-threaded; the provider is only ever driven from the
//! session loop.

use std::ffi::c_void;
use std::mem;
use std::path::PathBuf;
use std::ptr;

use tracing::{debug, trace, warn};
use windows_sys::core::BOOL;
use windows_sys::Win32::Foundation::{
    GetLastError, LocalFree, ERROR_NOACCESS, ERROR_PARTIAL_COPY, ERROR_SUCCESS, HANDLE,
};
use windows_sys::Win32::System::Diagnostics::Debug::{
    AddrModeFlat, StackWalk64, SymCleanup, SymEnumSymbolsW, SymFromAddrW, SymFunctionTableAccess64,
    SymGetLineFromAddrW64, SymGetModuleBase64, SymGetModuleInfoW64, SymGetTypeInfo, SymInitializeW,
    SymLoadModuleExW, SymSetContext, SymSetOptions, SymUnloadModule64, IMAGEHLP_LINEW64, IMAGEHLP_MODULEW64,
    IMAGEHLP_STACK_FRAME, STACKFRAME64, SYMBOL_INFOW,
};
use windows_sys::Win32::System::Threading::{
    OpenProcess, OpenThread, PROCESS_ALL_ACCESS, THREAD_GET_CONTEXT, THREAD_QUERY_INFORMATION,
};

use super::constants;
use super::context::NativeContext;
use super::handle::{from_wide, from_wide_ptr, null_wide, wide, OwnedHandle};
use crate::error::{DebuggerError, Result};
use crate::symbols::{BaseKind, SymTag, SymbolProvider, TypeInfoSource};
use crate::types::{
    Address, ModuleLoad, ProcessId, SourceLine, SymbolFlags, SymbolFormat, SymbolHit, SymbolScope, ThreadContext,
    ThreadId, VariableSymbol, WordSize,
};
use crate::unwind::{StackWalker, WalkFrame};

/// Symbol session for one target process
#[derive(Debug, Default)]
pub struct DbgHelpProvider
{
    process: Option<OwnedHandle>,
    pid: Option<ProcessId>,
}

impl DbgHelpProvider
{
    pub fn new() -> Self
    {
        Self::default()
    }

    fn handle(&self) -> Option<HANDLE>
    {
        self.process.as_ref().map(OwnedHandle::raw)
    }

    fn require_handle(&self) -> Result<HANDLE>
    {
        self.handle().ok_or(DebuggerError::NotAttached)
    }

    fn module_info(&self, address: Address) -> Option<IMAGEHLP_MODULEW64>
    {
        let process = self.handle()?;
        let mut info: IMAGEHLP_MODULEW64 = unsafe { mem::zeroed() };
        info.SizeOfStruct = mem::size_of::<IMAGEHLP_MODULEW64>() as u32;
        if unsafe { SymGetModuleInfoW64(process, address.value(), &mut info) } == 0 {
            return None;
        }
        Some(info)
    }

    /// Raw `SymGetTypeInfo` query writing into `out`.
    fn type_info<T>(&self, module: Address, type_id: u32, request: i32, out: &mut T) -> bool
    {
        let Some(process) = self.handle() else {
            return false;
        };
        let ok = unsafe { SymGetTypeInfo(process, module.value(), type_id, request, (out as *mut T).cast()) };
        ok != 0
    }

    fn type_u32(&self, module: Address, type_id: u32, request: i32) -> Option<u32>
    {
        let mut value = 0u32;
        self.type_info(module, type_id, request, &mut value).then_some(value)
    }
}

impl TypeInfoSource for DbgHelpProvider
{
    fn tag(&self, module: Address, type_id: u32) -> Option<SymTag>
    {
        self.type_u32(module, type_id, constants::TI_GET_SYMTAG).map(SymTag::from_raw)
    }

    fn base_kind(&self, module: Address, type_id: u32) -> Option<BaseKind>
    {
        self.type_u32(module, type_id, constants::TI_GET_BASETYPE).map(BaseKind::from_raw)
    }

    fn length(&self, module: Address, type_id: u32) -> Option<u64>
    {
        let mut length = 0u64;
        self.type_info(module, type_id, constants::TI_GET_LENGTH, &mut length).then_some(length)
    }

    fn inner_type(&self, module: Address, type_id: u32) -> Option<u32>
    {
        self.type_u32(module, type_id, constants::TI_GET_TYPEID)
    }

    fn is_reference(&self, module: Address, type_id: u32) -> bool
    {
        let mut reference: BOOL = 0;
        self.type_info(module, type_id, constants::TI_GET_IS_REFERENCE, &mut reference) && reference != 0
    }

    fn count(&self, module: Address, type_id: u32) -> Option<u32>
    {
        self.type_u32(module, type_id, constants::TI_GET_COUNT)
    }

    fn children(&self, module: Address, type_id: u32) -> Vec<u32>
    {
        let count = match self.type_u32(module, type_id, constants::TI_GET_CHILDRENCOUNT) {
            Some(count) if count > 0 => count,
            _ => return Vec::new(),
        };

        // TI_FINDCHILDREN_PARAMS: Count, Start, ChildId[Count]
        let mut params = vec![0u32; count as usize + 2];
        params[0] = count;
        let Some(process) = self.handle() else {
            return Vec::new();
        };
        let ok = unsafe {
            SymGetTypeInfo(
                process,
                module.value(),
                type_id,
                constants::TI_FINDCHILDREN,
                params.as_mut_ptr().cast(),
            )
        };
        if ok == 0 {
            trace!(type_id, "TI_FINDCHILDREN failed");
            return Vec::new();
        }
        params.split_off(2)
    }

    fn name(&self, module: Address, type_id: u32) -> Option<String>
    {
        let mut name: *mut u16 = ptr::null_mut();
        if !self.type_info(module, type_id, constants::TI_GET_SYMNAME, &mut name) {
            return None;
        }
        let text = unsafe { from_wide_ptr(name) };
        if !name.is_null() {
            // The name buffer is allocated by dbghelp
            unsafe {
                LocalFree(name.cast());
            }
        }
        text
    }

    fn offset(&self, module: Address, type_id: u32) -> Option<u32>
    {
        self.type_u32(module, type_id, constants::TI_GET_OFFSET)
    }

    fn constant_value(&self, module: Address, type_id: u32) -> Option<i128>
    {
        let mut variant = [0u64; 4];
        if !self.type_info(module, type_id, constants::TI_GET_VALUE, &mut variant) {
            return None;
        }
        decode_variant(&variant)
    }
}

impl SymbolProvider for DbgHelpProvider
{
    fn initialize(&mut self, pid: ProcessId) -> Result<()>
    {
        self.cleanup();

        let raw = unsafe { OpenProcess(PROCESS_ALL_ACCESS, 0, pid.0) };
        let process = OwnedHandle::new(raw).ok_or_else(|| DebuggerError::last_os_error("OpenProcess"))?;

        unsafe {
            SymSetOptions(constants::SYMBOL_OPTIONS);
        }
        if unsafe { SymInitializeW(process.raw(), null_wide(), 0) } == 0 {
            return Err(DebuggerError::last_os_error("SymInitializeW"));
        }
        debug!(pid = %pid, "symbol session started");
        self.process = Some(process);
        self.pid = Some(pid);
        Ok(())
    }

    fn load_module(&mut self, load: &ModuleLoad) -> Result<()>
    {
        let process = self.require_handle()?;
        let image = load.image.as_ref().map(wide);
        let image_ptr = image.as_ref().map_or(null_wide(), |image| image.as_ptr());

        let base = unsafe {
            SymLoadModuleExW(
                process,
                ptr::null_mut(),
                image_ptr,
                null_wide(),
                load.base.value(),
                0,
                ptr::null(),
                0,
            )
        };
        // 0 with ERROR_SUCCESS means the module was already loaded
        if base == 0 && unsafe { GetLastError() } != ERROR_SUCCESS {
            return Err(DebuggerError::last_os_error("SymLoadModuleExW"));
        }
        debug!(base = %load.base, image = ?load.image, "module symbols registered");
        Ok(())
    }

    fn unload_module(&mut self, base: Address) -> Result<()>
    {
        let process = self.require_handle()?;
        if unsafe { SymUnloadModule64(process, base.value()) } == 0 {
            return Err(DebuggerError::last_os_error("SymUnloadModule64"));
        }
        Ok(())
    }

    fn cleanup(&mut self)
    {
        if let Some(process) = self.process.take() {
            if unsafe { SymCleanup(process.raw()) } == 0 {
                warn!("SymCleanup failed: {}", std::io::Error::last_os_error());
            }
            debug!(pid = ?self.pid, "symbol session ended");
        }
        self.pid = None;
    }

    fn symbol_from_address(&self, address: Address) -> Option<SymbolHit>
    {
        let process = self.handle()?;

        // SYMBOL_INFOW is followed by room for the name
        let words = (mem::size_of::<SYMBOL_INFOW>() + constants::MAX_SYM_NAME * 2).div_ceil(8);
        let mut buffer = vec![0u64; words];
        let info = buffer.as_mut_ptr().cast::<SYMBOL_INFOW>();
        let mut displacement = 0u64;

        let name = unsafe {
            (*info).SizeOfStruct = mem::size_of::<SYMBOL_INFOW>() as u32;
            (*info).MaxNameLen = constants::MAX_SYM_NAME as u32;
            if SymFromAddrW(process, address.value(), &mut displacement, info) == 0 {
                return None;
            }
            let len = ((*info).NameLen as usize).min(constants::MAX_SYM_NAME);
            String::from_utf16_lossy(std::slice::from_raw_parts(ptr::addr_of!((*info).Name).cast::<u16>(), len))
        };
        Some(SymbolHit { name, displacement })
    }

    fn line_from_address(&self, address: Address) -> Option<SourceLine>
    {
        let process = self.handle()?;
        let mut line: IMAGEHLP_LINEW64 = unsafe { mem::zeroed() };
        line.SizeOfStruct = mem::size_of::<IMAGEHLP_LINEW64>() as u32;
        let mut displacement = 0u32;

        if unsafe { SymGetLineFromAddrW64(process, address.value(), &mut displacement, &mut line) } == 0 {
            return None;
        }
        let file = unsafe { from_wide_ptr(line.FileName) }?;
        Some(SourceLine {
            file: PathBuf::from(file),
            line: line.LineNumber,
            displacement,
        })
    }

    fn module_name(&self, address: Address) -> Option<String>
    {
        self.module_info(address)
            .map(|info| from_wide(&info.ModuleName))
            .filter(|name| !name.is_empty())
    }

    fn module_base(&self, address: Address) -> Option<Address>
    {
        let process = self.handle()?;
        let base = unsafe { SymGetModuleBase64(process, address.value()) };
        (base != 0).then(|| Address::from(base))
    }

    fn symbol_format(&self, base: Address) -> SymbolFormat
    {
        self.module_info(base)
            .map_or(SymbolFormat::None, |info| SymbolFormat::from_raw(info.SymType as u32))
    }

    fn enumerate_variables(&self, scope: SymbolScope, mask: &str) -> Result<Vec<VariableSymbol>>
    {
        let process = self.require_handle()?;

        let base = match scope {
            SymbolScope::Module(base) => base.value(),
            SymbolScope::Frame(pc) => {
                let mut frame: IMAGEHLP_STACK_FRAME = unsafe { mem::zeroed() };
                frame.InstructionOffset = pc.value();
                // Fails with ERROR_SUCCESS when the context did not change
                if unsafe { SymSetContext(process, &frame, ptr::null()) } == 0
                    && unsafe { GetLastError() } != ERROR_SUCCESS
                {
                    return Err(DebuggerError::Symbol(format!("cannot set the symbol context to {pc}")));
                }
                0
            }
        };

        let mask = if mask.is_empty() { "*" } else { mask };
        let mask = wide(mask);
        let mut found: Vec<VariableSymbol> = Vec::new();

        let ok = unsafe {
            SymEnumSymbolsW(
                process,
                base,
                mask.as_ptr(),
                Some(collect_variable),
                (&mut found as *mut Vec<VariableSymbol>).cast::<c_void>(),
            )
        };
        if ok == 0 {
            return Err(DebuggerError::Symbol(format!(
                "SymEnumSymbolsW failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        debug!(count = found.len(), ?scope, "variables enumerated");
        Ok(found)
    }

    fn stack_walker(&self, thread: ThreadId, word: WordSize) -> Result<Box<dyn StackWalker + '_>>
    {
        let process = self.require_handle()?;
        let raw = unsafe { OpenThread(THREAD_GET_CONTEXT | THREAD_QUERY_INFORMATION, 0, thread.0) };
        let thread = OwnedHandle::new(raw).ok_or_else(|| DebuggerError::last_os_error("OpenThread"))?;
        Ok(Box::new(DbgHelpWalker::new(process, thread, word)))
    }
}

impl Drop for DbgHelpProvider
{
    fn drop(&mut self)
    {
        self.cleanup();
    }
}

unsafe extern "system" fn collect_variable(info: *const SYMBOL_INFOW, _size: u32, context: *const c_void) -> BOOL
{
    if info.is_null() || context.is_null() {
        return 0;
    }
    let (found, info) = unsafe { (&mut *(context as *mut Vec<VariableSymbol>), &*info) };
    if info.Tag != SymTag::Data.raw() {
        return 1;
    }

    let name = unsafe { std::slice::from_raw_parts(ptr::addr_of!(info.Name).cast::<u16>(), info.NameLen as usize) };
    found.push(VariableSymbol {
        type_id: info.TypeIndex,
        size: info.Size,
        module_base: Address::from(info.ModBase),
        flags: SymbolFlags(info.Flags),
        value: info.Value,
        address: info.Address,
        register: info.Register,
        name: String::from_utf16_lossy(name),
    });
    1
}

/// Decode the integer payload of an enumerator's `VARIANT`.
fn decode_variant(variant: &[u64; 4]) -> Option<i128>
{
    let tag = (variant[0] & 0xFFFF) as u16;
    let data = variant[constants::VARIANT_DATA_OFFSET / 8];
    let value = match tag {
        constants::VT_I1 => i128::from(data as u8 as i8),
        constants::VT_UI1 => i128::from(data as u8),
        constants::VT_I2 => i128::from(data as u16 as i16),
        constants::VT_UI2 => i128::from(data as u16),
        constants::VT_I4 | constants::VT_INT => i128::from(data as u32 as i32),
        constants::VT_UI4 | constants::VT_UINT => i128::from(data as u32),
        constants::VT_I8 => i128::from(data as i64),
        constants::VT_UI8 => i128::from(data),
        constants::VT_BOOL => i128::from(data as u16 != 0),
        _ => return None,
    };
    Some(value)
}

/// `StackWalk64` over one stopped thread
///
/// Keeps its own native context record; `StackWalk64` rewrites it as it
/// unwinds, so it is captured once on the first step and reused after that.
pub struct DbgHelpWalker
{
    process: HANDLE,
    thread: OwnedHandle,
    word: WordSize,
    frame: STACKFRAME64,
    native: Option<NativeContext>,
}

impl DbgHelpWalker
{
    fn new(process: HANDLE, thread: OwnedHandle, word: WordSize) -> Self
    {
        Self {
            process,
            thread,
            word,
            frame: unsafe { mem::zeroed() },
            native: None,
        }
    }

    fn machine(&self) -> u32
    {
        match self.word {
            WordSize::Bits32 => constants::IMAGE_FILE_MACHINE_I386,
            WordSize::Bits64 => constants::IMAGE_FILE_MACHINE_AMD64,
        }
    }

    fn seed(&mut self, frame: &WalkFrame) -> Result<()>
    {
        let wow64 = cfg!(target_arch = "x86_64") && self.word == WordSize::Bits32;
        self.native = Some(NativeContext::capture_full(self.thread.raw(), wow64)?);

        self.frame.AddrPC.Offset = frame.pc.value();
        self.frame.AddrPC.Mode = AddrModeFlat;
        self.frame.AddrStack.Offset = frame.sp.value();
        self.frame.AddrStack.Mode = AddrModeFlat;
        self.frame.AddrFrame.Offset = frame.fp.value();
        self.frame.AddrFrame.Mode = AddrModeFlat;
        Ok(())
    }
}

impl StackWalker for DbgHelpWalker
{
    fn step(&mut self, frame: &mut WalkFrame, context: &mut ThreadContext) -> Result<bool>
    {
        if self.native.is_none() {
            self.seed(frame)?;
        }
        let machine = self.machine();
        let Some(native) = self.native.as_mut() else {
            return Ok(false);
        };

        let ok = unsafe {
            StackWalk64(
                machine,
                self.process,
                self.thread.raw(),
                &mut self.frame,
                native.as_mut_ptr(),
                None,
                Some(SymFunctionTableAccess64),
                Some(SymGetModuleBase64),
                None,
            )
        };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            if code == ERROR_NOACCESS || code == ERROR_PARTIAL_COPY {
                return Err(DebuggerError::MemoryRead {
                    address: self.frame.AddrFrame.Offset,
                    len: self.word.bytes(),
                });
            }
            return Ok(false);
        }

        frame.pc = Address::from(self.frame.AddrPC.Offset);
        frame.sp = Address::from(self.frame.AddrStack.Offset);
        frame.fp = Address::from(self.frame.AddrFrame.Offset);
        frame.return_address = Address::from(self.frame.AddrReturn.Offset);
        context.pc = frame.pc;
        context.sp = frame.sp;
        context.fp = frame.fp;
        Ok(true)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_decode_variant_signed_and_unsigned()
    {
        let mut variant = [0u64; 4];
        variant[0] = u64::from(constants::VT_I4);
        variant[1] = 0xFFFF_FFFF;
        assert_eq!(decode_variant(&variant), Some(-1));

        variant[0] = u64::from(constants::VT_UI4);
        assert_eq!(decode_variant(&variant), Some(0xFFFF_FFFF));

        variant[0] = u64::from(constants::VT_I1);
        variant[1] = 0x80;
        assert_eq!(decode_variant(&variant), Some(-128));
    }

    #[test]
    fn test_decode_variant_unknown_tag()
    {
        let variant = [8u64, 0, 0, 0];
        assert_eq!(decode_variant(&variant), None);
    }
}
