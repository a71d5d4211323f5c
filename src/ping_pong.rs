/// Two equal buffers exposing one logical field. Passes read `read()` and
/// write `write()`; `swap()` exchanges the roles so `read()` always holds
/// the most recently completed write.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    read: usize,
}

impl<T> PingPong<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { slots: [a, b], read: 0 }
    }

    #[inline]
    pub fn read(&self) -> &T {
        &self.slots[self.read]
    }

    #[inline]
    pub fn write(&self) -> &T {
        &self.slots[1 - self.read]
    }

    /// Read and write halves at once, borrowed disjointly.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        if self.read == 0 { (&*a, b) } else { (&*b, a) }
    }

    pub fn swap(&mut self) {
        self.read = 1 - self.read;
    }

    pub fn read_index(&self) -> usize {
        self.read
    }
}

#[derive(Debug, Clone)]
pub enum FieldBuffers<T> {
    Single(T),
    Double(PingPong<T>),
}

impl<T> FieldBuffers<T> {
    pub fn read(&self) -> &T {
        match self {
            FieldBuffers::Single(t) => t,
            FieldBuffers::Double(pp) => pp.read(),
        }
    }

    pub fn swap(&mut self) {
        if let FieldBuffers::Double(pp) = self {
            pp.swap();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (a, b) = match self {
            FieldBuffers::Single(t) => (t, None),
            FieldBuffers::Double(pp) => (&pp.slots[0], Some(&pp.slots[1])),
        };
        std::iter::once(a).chain(b)
    }
}
