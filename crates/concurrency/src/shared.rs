//! Cross-process storage in anonymous shared memory
//!
//! The value and a process-shared pthread mutex live side by side in one
//! `MAP_SHARED | MAP_ANONYMOUS` mapping. A forked child inherits the mapping
//! at the same address, so a cell handle copied into the child by `fork`
//! still points at the parent's value and lock.
//!
//! ## Layout
//!
//! ```text
//! +---------------------------+--------------+------------+
//! | pthread_mutex_t (pshared) | held: atomic | value: T   |
//! +---------------------------+--------------+------------+
//! ```
//!
//! `held` mirrors the mutex for observers: a guard sets it after acquiring
//! and clears it before releasing, so `is_locked` never touches the mutex.
//!
//! ## Lifetime
//!
//! Every process unmaps its own view when its handle is dropped. Only the
//! creating process destroys the mutex, so it must outlive (join) every child
//! still using the cell.
//!
//! A process killed while holding the lock leaves it held; there is no
//! owner-death recovery.

use std::cell::UnsafeCell;
use std::io;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use syncnum_core::{Numeric, Sharing};
use tracing::debug;

use crate::backing::Backing;

#[repr(C)]
struct SharedSlot<T> {
    mutex: UnsafeCell<libc::pthread_mutex_t>,
    held: AtomicBool,
    value: UnsafeCell<T>,
}

/// Storage shared with forked child processes
pub struct SharedMemoryBacking<T> {
    slot: NonNull<SharedSlot<T>>,
    len: usize,
    creator: libc::pid_t,
}

// SAFETY: all access to the slot goes through the process-shared mutex, and
// `T: Numeric` is `Copy` plain data without thread affinity.
unsafe impl<T: Send> Send for SharedMemoryBacking<T> {}
unsafe impl<T: Send> Sync for SharedMemoryBacking<T> {}

impl<T: Numeric> SharedMemoryBacking<T> {
    /// Map a shared region and store `initial` in it
    pub fn new(initial: T) -> io::Result<Self> {
        let len = mem::size_of::<SharedSlot<T>>();

        // SAFETY: anonymous mapping with no fixed address; the result is
        // checked against MAP_FAILED before use.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let slot = addr.cast::<SharedSlot<T>>();

        // SAFETY: `slot` points to `len` writable, page-aligned bytes that no
        // other process can see yet.
        unsafe {
            let mutex = ptr::addr_of_mut!((*slot).mutex).cast::<libc::pthread_mutex_t>();
            if let Err(e) = init_process_shared_mutex(mutex) {
                libc::munmap(addr, len);
                return Err(e);
            }
            ptr::write(ptr::addr_of_mut!((*slot).held), AtomicBool::new(false));
            ptr::write(ptr::addr_of_mut!((*slot).value).cast::<T>(), initial);
        }

        // SAFETY: getpid cannot fail
        let creator = unsafe { libc::getpid() };
        debug!(bytes = len, pid = creator, "mapped shared cell region");

        Ok(Self {
            // SAFETY: mmap succeeded, so the address is non-null
            slot: unsafe { NonNull::new_unchecked(slot) },
            len,
            creator,
        })
    }

    fn slot(&self) -> &SharedSlot<T> {
        // SAFETY: the mapping stays valid until `self` is dropped
        unsafe { self.slot.as_ref() }
    }

    fn mutex(&self) -> *mut libc::pthread_mutex_t {
        self.slot().mutex.get()
    }
}

unsafe fn init_process_shared_mutex(mutex: *mut libc::pthread_mutex_t) -> io::Result<()> {
    let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
    check(libc::pthread_mutexattr_init(attr.as_mut_ptr()))?;
    let result = check(libc::pthread_mutexattr_setpshared(
        attr.as_mut_ptr(),
        libc::PTHREAD_PROCESS_SHARED,
    ))
    .and_then(|()| check(libc::pthread_mutex_init(mutex, attr.as_ptr())));
    libc::pthread_mutexattr_destroy(attr.as_mut_ptr());
    result
}

fn check(rc: libc::c_int) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}

#[cold]
fn mutex_failure(op: &str, rc: libc::c_int) -> ! {
    // Only reachable if the mutex was never initialised or memory was corrupted.
    panic!("{op} failed on shared cell mutex: {}", io::Error::from_raw_os_error(rc))
}

impl<T: Numeric> Backing<T> for SharedMemoryBacking<T> {
    type Guard<'a> = SharedGuard<'a, T>
    where
        Self: 'a;

    /// # Panics
    ///
    /// Panics if the OS reports the mutex as invalid.
    fn lock(&self) -> SharedGuard<'_, T> {
        // SAFETY: the mutex was initialised in `new` and lives in the mapping
        let rc = unsafe { libc::pthread_mutex_lock(self.mutex()) };
        if rc != 0 {
            mutex_failure("pthread_mutex_lock", rc);
        }
        SharedGuard::new(self.slot())
    }

    fn try_lock(&self) -> Option<SharedGuard<'_, T>> {
        // SAFETY: as in `lock`
        match unsafe { libc::pthread_mutex_trylock(self.mutex()) } {
            0 => Some(SharedGuard::new(self.slot())),
            libc::EBUSY => None,
            rc => mutex_failure("pthread_mutex_trylock", rc),
        }
    }

    fn is_locked(&self) -> bool {
        self.slot().held.load(Ordering::Acquire)
    }

    fn sharing(&self) -> Sharing {
        Sharing::CrossProcess
    }
}

impl<T> Drop for SharedMemoryBacking<T> {
    fn drop(&mut self) {
        // SAFETY: the slot is not referenced by any live guard (guards borrow
        // `self`), and the mapping is removed exactly once per process.
        unsafe {
            let pid = libc::getpid();
            if pid == self.creator {
                libc::pthread_mutex_destroy(self.slot.as_ref().mutex.get());
                debug!(pid, "destroyed shared cell mutex");
            }
            libc::munmap(self.slot.as_ptr().cast(), self.len);
        }
    }
}

/// Guard over a shared-memory value; unlocks the pthread mutex on drop
///
/// Not `Send`: a pthread mutex must be unlocked by the thread that locked it.
pub struct SharedGuard<'a, T> {
    slot: &'a SharedSlot<T>,
    _not_send: PhantomData<*const ()>,
}

impl<'a, T> SharedGuard<'a, T> {
    fn new(slot: &'a SharedSlot<T>) -> Self {
        slot.held.store(true, Ordering::Release);
        Self {
            slot,
            _not_send: PhantomData,
        }
    }
}

impl<T> Deref for SharedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the mutex is held for the guard's lifetime
        unsafe { &*self.slot.value.get() }
    }
}

impl<T> DerefMut for SharedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the mutex is held for the guard's lifetime
        unsafe { &mut *self.slot.value.get() }
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    fn drop(&mut self) {
        self.slot.held.store(false, Ordering::Release);
        // SAFETY: this guard is the lock holder
        unsafe {
            libc::pthread_mutex_unlock(self.slot.mutex.get());
        }
    }
}
